// Caught-value model and conversions
// Provides tools for bringing arbitrary caught values into normalization

use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::{BaseError, Metadata};

/// A value obtained from a failure boundary, sorted into the three shapes
/// normalization distinguishes.
#[derive(Debug)]
pub enum Caught {
    /// An error that already went through normalization. It passes through
    /// [`BaseError::from_caught`] unchanged.
    Raised(BaseError),
    /// A host-native error. Only its display message and source chain are
    /// harvested; host error internals never populate metadata.
    Foreign(Box<dyn StdError + Send + Sync>),
    /// Arbitrary caught data: an object, an array, or a bare primitive.
    Value(Value),
}

impl Caught {
    /// Box a concrete host error and sort it.
    pub fn from_error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_boxed(Box::new(error))
    }

    /// Sort a boxed host error, recovering an already-normalized error by
    /// downcast so it keeps its identity through trait-object round-trips.
    pub fn from_boxed(error: Box<dyn StdError + Send + Sync>) -> Self {
        match error.downcast::<BaseError>() {
            Ok(raised) => Caught::Raised(*raised),
            Err(foreign) => Caught::Foreign(foreign),
        }
    }
}

/// Trait for converting a value into a [`Caught`].
pub trait IntoCaught {
    /// Convert the value into a [`Caught`].
    fn into_caught(self) -> Caught;
}

impl IntoCaught for Caught {
    fn into_caught(self) -> Caught {
        self
    }
}

impl IntoCaught for BaseError {
    fn into_caught(self) -> Caught {
        Caught::Raised(self)
    }
}

impl IntoCaught for Value {
    fn into_caught(self) -> Caught {
        Caught::Value(self)
    }
}

impl IntoCaught for Metadata {
    fn into_caught(self) -> Caught {
        Caught::Value(Value::Object(self))
    }
}

// Implementations for bare primitives exist so that rejection happens inside
// normalization, with a proper UnsupportedValue, rather than at the call site
// through a missing impl.
impl IntoCaught for String {
    fn into_caught(self) -> Caught {
        Caught::Value(Value::String(self))
    }
}

impl IntoCaught for &str {
    fn into_caught(self) -> Caught {
        Caught::Value(Value::String(self.to_string()))
    }
}

impl IntoCaught for bool {
    fn into_caught(self) -> Caught {
        Caught::Value(Value::Bool(self))
    }
}

impl IntoCaught for i64 {
    fn into_caught(self) -> Caught {
        Caught::Value(Value::Number(self.into()))
    }
}

impl IntoCaught for u64 {
    fn into_caught(self) -> Caught {
        Caught::Value(Value::Number(self.into()))
    }
}

impl IntoCaught for f64 {
    fn into_caught(self) -> Caught {
        // Non-finite floats have no JSON rendering and degrade to null.
        let value = serde_json::Number::from_f64(self)
            .map(Value::Number)
            .unwrap_or(Value::Null);
        Caught::Value(value)
    }
}

impl IntoCaught for std::io::Error {
    fn into_caught(self) -> Caught {
        Caught::from_error(self)
    }
}

impl IntoCaught for serde_json::Error {
    fn into_caught(self) -> Caught {
        Caught::from_error(self)
    }
}

impl IntoCaught for anyhow::Error {
    fn into_caught(self) -> Caught {
        match self.downcast::<BaseError>() {
            Ok(raised) => Caught::Raised(raised),
            Err(foreign) => Caught::Foreign(foreign.into()),
        }
    }
}

impl IntoCaught for Box<dyn StdError + Send + Sync> {
    fn into_caught(self) -> Caught {
        Caught::from_boxed(self)
    }
}

/// The shape of a JSON value, used to describe rejected primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    /// Classify a JSON value.
    pub fn of(value: &Value) -> ValueKind {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Whether this kind is rejected by normalization.
    pub fn is_primitive(self) -> bool {
        !matches!(self, ValueKind::Array | ValueKind::Object)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Null => write!(f, "null"),
            ValueKind::Boolean => write!(f, "boolean"),
            ValueKind::Number => write!(f, "number"),
            ValueKind::String => write!(f, "string"),
            ValueKind::Array => write!(f, "array"),
            ValueKind::Object => write!(f, "object"),
        }
    }
}

/// Rejection raised when normalization receives a bare primitive.
///
/// There is no structured error to build from a loose string, number,
/// boolean or null without silently inventing one, so the caller is told
/// instead. The rejected value is retained for inspection.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot build a structured error from a bare {kind} value: {value}")]
pub struct UnsupportedValue {
    kind: ValueKind,
    value: Value,
}

impl UnsupportedValue {
    pub(crate) fn new(value: Value) -> Self {
        Self {
            kind: ValueKind::of(&value),
            value,
        }
    }

    /// The shape of the rejected value.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The rejected value itself.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume the rejection and recover the value.
    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Coerce a JSON value to text: strings pass through bare, everything else
/// renders as its compact JSON form. Message extraction and the text
/// rendering share this rule.
pub(crate) fn text_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Render an error source chain as a single colon-separated line.
pub(crate) fn source_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(next) = current {
        rendered.push_str(": ");
        rendered.push_str(&next.to_string());
        current = next.source();
    }
    rendered
}
