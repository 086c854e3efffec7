//! Contexts built from JSON documents.

use crate::interpreter::{Map, Value};

/// Objects become maps. Arrays become maps keyed by index, with a `length`
/// entry. Numbers are floats, like number literals, so `==` compares them.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Nil, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                let mut map = Map::default();
                map.insert("length".to_string(), Value::Number(items.len() as f64));
                for (index, item) in items.into_iter().enumerate() {
                    map.insert(index.to_string(), item.into());
                }
                map.into()
            }
            serde_json::Value::Object(object) => object
                .into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect::<Map>()
                .into(),
        }
    }
}

/// Parse a JSON document into a context value.
pub fn from_str(text: &str) -> Result<Value, serde_json::Error> {
    Ok(serde_json::from_str::<serde_json::Value>(text)?.into())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(from_str("null").unwrap(), Value::Nil);
        assert_eq!(from_str("true").unwrap(), Value::Boolean(true));
        assert_eq!(from_str("-4").unwrap(), Value::Number(-4.0));
        assert_eq!(
            from_str("18446744073709551615").unwrap(),
            Value::Number(u64::MAX as f64)
        );
        assert_eq!(from_str("1.5").unwrap(), Value::Number(1.5));
        assert_eq!(from_str("\"s\"").unwrap(), Value::from("s"));
    }

    #[test]
    fn test_documents_are_contexts() {
        let context = from_str(r#"{"user": {"age": 42, "tags": ["a", "b"]}}"#).unwrap();
        let program = crate::parse("user.age == 42 && user.tags.length == 2").unwrap();
        assert_eq!(program.exec(context.clone()).unwrap(), Value::Boolean(true));

        let program = crate::parse("user.age != 42 || user.age > 41.5").unwrap();
        assert_eq!(program.exec(context.clone()).unwrap(), Value::Boolean(true));

        let program = crate::parse("user.age % 5 == 2").unwrap();
        // `%` yields an integer
        assert_eq!(program.exec(context).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_invalid_json() {
        assert!(from_str("{").is_err());
    }
}
