use super::{EvalError, Value};

/// Booleans and integers of any width (non-zero is true). Floats, strings
/// and everything else are rejected.
pub fn to_boolean(value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Integer(n) => Ok(*n != 0),
        Value::Unsigned(n) => Ok(*n != 0),
        other => Err(EvalError::NotBoolean {
            value: other.to_string(),
            kind: other.type_name().to_string(),
        }),
    }
}

/// Integers of any width and floats, as a 64-bit float.
pub fn to_number(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Integer(n) => Ok(*n as f64),
        Value::Unsigned(n) => Ok(*n as f64),
        Value::Number(n) => Ok(*n),
        other => Err(EvalError::NotNumeric {
            value: other.to_string(),
            kind: other.type_name().to_string(),
        }),
    }
}
