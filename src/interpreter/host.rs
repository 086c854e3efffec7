//! Member resolution against host-supplied values.
//!
//! A name is resolved against the current frame by asking, in order:
//!
//! 1. the frame's [`Variables`] capability, if it has one;
//! 2. its string-keyed entries (a [`Value::Map`] or [`Host::entries`]), where
//!    a missing key is `nil` rather than an error;
//! 3. a zero-argument [`Host::method`] with that name;
//! 4. a [`Host::field`] with that name.
//!
//! Anything else is a [`EvalError::NoSuchMember`].

use std::{fmt::Debug, rc::Rc};

use rustc_hash::FxHashMap;

use super::{EvalError, Map, Value};

/// Failure reported by host code while resolving a name.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct HostError(String);

impl HostError {
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}

impl From<&str> for HostError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HostError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Single-argument lookup of a variable by name.
pub trait Variables {
    fn variable(&self, name: &str) -> Result<Value, HostError>;
}

impl<F> Variables for F
where
    F: Fn(&str) -> Result<Value, HostError>,
{
    fn variable(&self, name: &str) -> Result<Value, HostError> {
        self(name)
    }
}

/// What a host method handed back.
#[derive(Debug)]
pub enum Returned {
    Single(Value),
    /// A value together with an optional failure.
    Pair(Value, Option<HostError>),
    /// A raw list of return values. Only one value, or a value followed by
    /// `nil`, is accepted.
    Many(Vec<Value>),
}

impl From<Value> for Returned {
    fn from(value: Value) -> Self {
        Returned::Single(value)
    }
}

impl From<Result<Value, HostError>> for Returned {
    fn from(result: Result<Value, HostError>) -> Self {
        match result {
            Ok(value) => Returned::Pair(value, None),
            Err(e) => Returned::Pair(Value::Nil, Some(e)),
        }
    }
}

/// A host object that expressions can dereference.
///
/// Every capability is optional; implement the ones the object has.
pub trait Host {
    fn type_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn variables(&self) -> Option<&dyn Variables> {
        None
    }

    fn entries(&self) -> Option<&Map> {
        None
    }

    /// Invoke the zero-argument method `name`, if there is one.
    fn method(&self, _name: &str) -> Option<Returned> {
        None
    }

    fn field(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl<T: Host + ?Sized> Host for Rc<T> {
    fn type_name(&self) -> &str {
        (**self).type_name()
    }

    fn variables(&self) -> Option<&dyn Variables> {
        (**self).variables()
    }

    fn entries(&self) -> Option<&Map> {
        (**self).entries()
    }

    fn method(&self, name: &str) -> Option<Returned> {
        (**self).method(name)
    }

    fn field(&self, name: &str) -> Option<Value> {
        (**self).field(name)
    }
}

impl<T: Host + ?Sized> Host for Box<T> {
    fn type_name(&self) -> &str {
        (**self).type_name()
    }

    fn variables(&self) -> Option<&dyn Variables> {
        (**self).variables()
    }

    fn entries(&self) -> Option<&Map> {
        (**self).entries()
    }

    fn method(&self, name: &str) -> Option<Returned> {
        (**self).method(name)
    }

    fn field(&self, name: &str) -> Option<Value> {
        (**self).field(name)
    }
}

/// A callback used as a context.
pub struct Resolver<F>(pub F);

impl<F: Variables> Host for Resolver<F> {
    fn type_name(&self) -> &str {
        "resolver"
    }

    fn variables(&self) -> Option<&dyn Variables> {
        Some(&self.0)
    }
}

/// A host object assembled from registered fields and methods.
pub struct Record {
    name: String,
    fields: FxHashMap<String, Value>,
    methods: FxHashMap<String, Box<dyn Fn() -> Returned>>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: FxHashMap::default(),
            methods: FxHashMap::default(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn() -> Returned + 'static,
    {
        self.methods.insert(name.into(), Box::new(method));
        self
    }
}

impl Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Host for Record {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn method(&self, name: &str) -> Option<Returned> {
        self.methods.get(name).map(|method| method())
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }
}

/// Resolve `name` against `base`.
pub fn resolve(base: &Value, name: &str) -> Result<Value, EvalError> {
    let host = match base {
        Value::Map(map) => return Ok(map.get(name).cloned().unwrap_or(Value::Nil)),
        Value::Host(host) => host,
        other => {
            return Err(EvalError::NoSuchMember {
                name: name.to_string(),
                base: other.type_name().to_string(),
            })
        }
    };

    if let Some(variables) = host.variables() {
        return variables.variable(name).map_err(|source| EvalError::Host {
            name: name.to_string(),
            source,
        });
    }

    if let Some(entries) = host.entries() {
        return Ok(entries.get(name).cloned().unwrap_or(Value::Nil));
    }

    if let Some(returned) = host.method(name) {
        return unpack(name, returned);
    }

    host.field(name).ok_or_else(|| EvalError::NoSuchMember {
        name: name.to_string(),
        base: host.type_name().to_string(),
    })
}

fn unpack(name: &str, returned: Returned) -> Result<Value, EvalError> {
    match returned {
        Returned::Single(value) | Returned::Pair(value, None) => Ok(value),
        Returned::Pair(_, Some(source)) => Err(EvalError::Host {
            name: name.to_string(),
            source,
        }),
        Returned::Many(values) => match values.as_slice() {
            [value] | [value, Value::Nil] => Ok(value.clone()),
            [_, other] => Err(EvalError::MalformedAccessor {
                name: name.to_string(),
                reason: format!(
                    "second return value must be an error, got {} ({})",
                    other,
                    other.type_name()
                ),
            }),
            values => Err(EvalError::MalformedAccessor {
                name: name.to_string(),
                reason: format!("expected 1 or 2 return values, got {}", values.len()),
            }),
        },
    }
}
