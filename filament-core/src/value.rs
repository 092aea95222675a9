//! The dynamic value model.
//!
//! Dependency paths like `ui.children.*.flex` are resolved at runtime
//! against whatever objects the embedding application put in scope, so the
//! values flowing through the graph are dynamically typed. `Value` covers
//! the shapes the resolver has to walk: scalars, sequences, attribute maps,
//! and signals themselves (a path segment may cross a signal whose *value*
//! holds the next object).
//!
//! `ComputeResult` is the return type of every compute function. It replaces
//! the classic "undefined" sentinel with a tagged union: a compute that has
//! nothing new to say returns `NoUpdate`, which is distinct from producing
//! `Value::Null`.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::reactive::Signal;

/// A dynamically typed value carried by a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(IndexMap<String, Value>),
    /// A live signal node. Appears when objects in scope hold signals as
    /// attributes; the resolver treats it as "read me and keep walking".
    Signal(Signal),
}

impl Value {
    /// Numeric view: `Int` and `Float` both convert.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_signal(&self) -> bool {
        matches!(self, Value::Signal(_))
    }

    /// Build an object value from `(name, value)` pairs.
    pub fn object<I>(fields: I) -> Value
    where
        I: IntoIterator<Item = (&'static str, Value)>,
    {
        Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(map) => write!(f, "<object with {} fields>", map.len()),
            Value::Signal(s) => write!(f, "<signal '{}'>", s.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Signal> for Value {
    fn from(v: Signal) -> Self {
        Value::Signal(v)
    }
}

/// Outcome of a compute function.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputeResult {
    /// A (possibly unchanged) value was produced.
    Value(Value),
    /// Nothing to report; the current value stands.
    NoUpdate,
}

impl<T> From<T> for ComputeResult
where
    T: Into<Value>,
{
    fn from(v: T) -> Self {
        ComputeResult::Value(v.into())
    }
}

/// Shared compute function, invoked with one positional value per resolved
/// upstream dependency (kind-specific arities are documented on the signal
/// constructors).
pub type ComputeFn = Arc<dyn Fn(&[Value]) -> ComputeResult + Send + Sync>;
