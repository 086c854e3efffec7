use std::{
    fmt::{Debug, Display},
    rc::Rc,
};

use rustc_hash::FxHashMap;

use crate::ast::Literal;

use super::host::{Host, HostError, Resolver};

/// A string-keyed mapping usable as an evaluation context.
pub type Map = FxHashMap<String, Value>;

/// A dynamically typed value.
///
/// Expressions only ever produce `Nil`, `Boolean`, `Number`, `String` and, for
/// `%`, `Integer`. The remaining variants carry host data through member
/// access chains.
#[derive(Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Unsigned(u64),
    Number(f64),
    String(String),
    Map(Rc<Map>),
    Host(Rc<dyn Host>),
}

impl Value {
    /// Wrap a name-lookup callback as a context.
    pub fn resolver<F>(resolve: F) -> Self
    where
        F: Fn(&str) -> Result<Value, HostError> + 'static,
    {
        Value::Host(Rc::new(Resolver(resolve)))
    }

    pub fn host(host: impl Host + 'static) -> Self {
        Value::Host(Rc::new(host))
    }

    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(Rc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "bool",
            Value::Integer(_) => "int",
            Value::Unsigned(_) => "uint",
            Value::Number(_) => "float",
            Value::String(_) => "string",
            Value::Map(_) => "map",
            Value::Host(host) => host.type_name(),
        }
    }
}

/// Equality never coerces: values of different kinds are never equal, and
/// maps and host objects are only equal to themselves.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Unsigned(a), Value::Unsigned(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Integer(n) => f.debug_tuple("Integer").field(n).finish(),
            Value::Unsigned(n) => f.debug_tuple("Unsigned").field(n).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::Host(host) => write!(f, "Host<{}>", host.type_name()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Unsigned(n) => write!(f, "{}", n),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Map(map) => {
                let mut keys = map.keys().collect::<Vec<_>>();
                keys.sort();
                write!(f, "{{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, map[key])?;
                }
                write!(f, "}}")
            }
            Value::Host(host) => write!(f, "<{}>", host.type_name()),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Nil => Value::Nil,
        }
    }
}

macro_rules! from_integer {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for Value {
                fn from(n: $source) -> Self {
                    Value::$variant(n as $target)
                }
            }
        )+
    };
}

from_integer!(Integer as i64: i8, i16, i32, i64, isize);
from_integer!(Unsigned as u64: u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(Rc::new(map))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_integer_widths() {
        assert_eq!(Value::from(7u8), Value::Unsigned(7));
        assert_eq!(Value::from(-7i16), Value::Integer(-7));
        assert_eq!(Value::from(7usize), Value::Unsigned(7));
        assert_eq!(Value::from(1.5f32), Value::Number(1.5));
        assert_eq!(Value::from(None::<i32>), Value::Nil);
    }

    #[test]
    fn test_equality_is_strict() {
        assert_ne!(Value::Integer(1), Value::Number(1.0));
        assert_ne!(Value::Integer(1), Value::Unsigned(1));
        assert_ne!(Value::from("1"), Value::Number(1.0));
        assert_eq!(Value::from("yes"), Value::from("yes"));

        let map = Value::map([("a", 1)]);
        assert_eq!(map, map.clone());
        assert_ne!(map, Value::map([("a", 1)]));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
        assert_eq!(Value::from("x").to_string(), "\"x\"");
        assert_eq!(
            Value::from("say \"hi\"\n").to_string(),
            r#""say \"hi\"\n""#
        );
        assert_eq!(
            Value::map([("b", Value::Nil), ("a", Value::from(true))]).to_string(),
            "{a: true, b: nil}"
        );
    }
}
