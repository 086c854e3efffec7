mod coerce;
mod frames;
pub mod host;
mod value;

use crate::ast::{Expression, InfixOperator, Program, RelationalOperator};

pub use self::{
    coerce::{to_boolean, to_number},
    host::{Host, HostError, Record, Resolver, Returned, Variables},
    value::{Map, Value},
};

use self::frames::Frames;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("Cannot cast {value} ({kind}) to bool")]
    NotBoolean { value: String, kind: String },
    #[error("Cannot cast {value} ({kind}) to numeric")]
    NotNumeric { value: String, kind: String },
    #[error("No such member: {name} on {base}")]
    NoSuchMember { name: String, base: String },
    #[error("Malformed accessor {name}: {reason}")]
    MalformedAccessor { name: String, reason: String },
    #[error("Could not resolve {name}: {source}")]
    Host {
        name: String,
        #[source]
        source: HostError,
    },
    #[error("Invalid integer remainder: {0} % {1}")]
    InvalidRemainder(i64, i64),
}

/// Walks a tree against one context. Each evaluation owns its own frames.
#[derive(Debug)]
pub struct Interpreter {
    frames: Frames,
}

impl Interpreter {
    pub fn new(context: Value) -> Self {
        Self {
            frames: Frames::new(context),
        }
    }

    pub fn evaluate(&mut self, expression: &Expression) -> Result<Value, EvalError> {
        #[cfg(feature = "trace")]
        log::trace!("{:?} <- {}", self.frames, expression);

        match expression {
            Expression::Literal(literal) => Ok(literal.into()),
            Expression::Identifier(name) => host::resolve(self.frames.current(), name),
            Expression::Deref(left, right) => {
                let base = self.evaluate(left)?;
                self.in_frame(base, |interpreter| interpreter.evaluate(right))
            }
            Expression::Or(left, right) => {
                if to_boolean(&self.evaluate(left)?)? {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(to_boolean(&self.evaluate(right)?)?))
            }
            Expression::And(left, right) => {
                if !to_boolean(&self.evaluate(left)?)? {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(to_boolean(&self.evaluate(right)?)?))
            }
            Expression::Relational(left, op, right) => {
                let a = self.evaluate(left)?;
                let b = self.evaluate(right)?;
                relational(*op, &a, &b)
            }
            Expression::Arithmetic(left, op, right) => {
                let a = to_number(&self.evaluate(left)?)?;
                let b = to_number(&self.evaluate(right)?)?;
                arithmetic(*op, a, b)
            }
        }
    }

    /// Run `f` with `frame` as the dereference base, restoring the previous
    /// base afterwards whether or not `f` succeeded.
    fn in_frame<T>(
        &mut self,
        frame: Value,
        f: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        self.frames.push(frame);
        let result = f(self);
        self.frames.pop();
        result
    }
}

fn relational(op: RelationalOperator, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let result = match op {
        RelationalOperator::Equal => a == b,
        RelationalOperator::NotEqual => a != b,
        RelationalOperator::LessThan => to_number(a)? < to_number(b)?,
        RelationalOperator::LessThanOrEqual => to_number(a)? <= to_number(b)?,
        RelationalOperator::GreaterThan => to_number(a)? > to_number(b)?,
        RelationalOperator::GreaterThanOrEqual => to_number(a)? >= to_number(b)?,
    };
    Ok(Value::Boolean(result))
}

fn arithmetic(op: InfixOperator, a: f64, b: f64) -> Result<Value, EvalError> {
    Ok(match op {
        InfixOperator::Plus => Value::Number(a + b),
        InfixOperator::Minus => Value::Number(a - b),
        InfixOperator::Multiply => Value::Number(a * b),
        InfixOperator::Divide => Value::Number(a / b),
        // remainder is taken on the truncated operands and stays an integer
        InfixOperator::Modulo => {
            let (a, b) = (a as i64, b as i64);
            Value::Integer(a.checked_rem(b).ok_or(EvalError::InvalidRemainder(a, b))?)
        }
    })
}

impl Program {
    /// Evaluate against `context`. The program itself is never modified, so
    /// it can be evaluated repeatedly and from several threads at once.
    pub fn exec(&self, context: impl Into<Value>) -> Result<Value, EvalError> {
        let mut interpreter = Interpreter::new(context.into());
        let result = interpreter.evaluate(self.root());
        debug_assert_eq!(interpreter.frames.depth(), 1);

        if let Err(e) = &result {
            log::debug!("evaluating {} failed: {}", self, e);
        }
        result
    }
}
