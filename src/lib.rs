//! A small embeddable predicate language.
//!
//! An expression such as `order.total > 100 && customer.verified` is compiled
//! once into a [`Program`] and then evaluated against any number of host
//! contexts: a string-keyed [`Map`], a name-resolving callback, or an object
//! implementing [`Host`].
//!
//! ```
//! use epl::Value;
//!
//! let program = epl::parse("order.total * 2 >= 50").unwrap();
//! let context = Value::map([("order", Value::map([("total", 30)]))]);
//! assert_eq!(program.exec(context).unwrap(), Value::Boolean(true));
//! ```

pub mod ast;
pub mod interpreter;
pub mod json;
pub mod parser;
pub mod span;
pub mod tokenizer;

pub use ast::Program;
pub use interpreter::{EvalError, Host, HostError, Map, Record, Returned, Value, Variables};
pub use parser::{parse, parse_with, Limits, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Compile and evaluate `source` once.
pub fn evaluate(source: &str, context: impl Into<Value>) -> Result<Value, Error> {
    Ok(parse(source)?.exec(context)?)
}
