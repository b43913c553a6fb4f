// Plinth Error Handling
// Central structured error type and catch-value normalization utilities

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// Re-export common error handling tools for convenience
pub use anyhow;
pub use serde_json;
pub use thiserror;

// Module structure
mod caught;
mod macros;

pub use caught::{Caught, IntoCaught, UnsupportedValue, ValueKind};

/// Name reported by errors that were not given a more specific one.
pub const DEFAULT_NAME: &str = "BaseError";

/// Sentinel used in structured output when no upstream cause was recorded.
pub const UNKNOWN_CAUSE: &str = "Unknown Cause";

/// Auxiliary key/value context attached to a [`BaseError`].
///
/// Entries keep their insertion order, which is observable in the text
/// rendering and in structured output.
pub type Metadata = serde_json::Map<String, Value>;

/// Result type for normalization of caught values.
pub type NormalizeResult<T> = std::result::Result<T, UnsupportedValue>;

/// The uniform error value shared across the plinth packages.
///
/// A `BaseError` is either constructed directly with a message and optional
/// metadata, or derived from an arbitrary caught value through
/// [`BaseError::from_caught`]. `name` and `message` are fixed once the error
/// is in circulation; `metadata` and `cause` stay open for holders to extend
/// before the error reaches a sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseError {
    name: String,
    message: String,
    #[serde(default)]
    metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<Value>,
}

impl BaseError {
    /// Create a new error with the given message and no metadata.
    ///
    /// The call path is captured here, when the platform supports it.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            message: message.into(),
            metadata: Metadata::new(),
            stack: capture_stack(),
            cause: None,
        }
    }

    /// Replace the metadata map wholesale.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Override the error name for specialized variants.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Record an upstream cause.
    pub fn with_cause(mut self, cause: impl Into<Value>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Get the error name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the metadata map.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Get mutable access to the metadata map.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Insert a single metadata entry, returning any value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.metadata.insert(key.into(), value.into())
    }

    /// Get the call path captured at construction, if the platform provided one.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Get the recorded upstream cause, if any.
    pub fn cause(&self) -> Option<&Value> {
        self.cause.as_ref()
    }

    /// Record an upstream cause on an existing error.
    pub fn set_cause(&mut self, cause: impl Into<Value>) {
        self.cause = Some(cause.into());
    }

    /// Normalize an arbitrary caught value into a `BaseError`.
    ///
    /// Already-normalized errors pass through unchanged (the same value, not
    /// a copy), so this is cheap to call defensively at every failure
    /// boundary. Host errors contribute their display message and source
    /// chain only. JSON objects and arrays are salvaged into message plus
    /// metadata. Bare primitives are rejected: silently wrapping a loose
    /// string or number would hide that the failure site never produced an
    /// error-shaped value.
    pub fn from_caught(value: impl IntoCaught) -> NormalizeResult<Self> {
        match value.into_caught() {
            Caught::Raised(error) => Ok(error),
            Caught::Foreign(error) => {
                let mut base = BaseError::new(error.to_string());
                if let Some(source) = error.source() {
                    base.cause = Some(Value::String(caught::source_chain(source)));
                }
                Ok(base)
            }
            Caught::Value(Value::Object(map)) => {
                // The message path short-circuits before any serialization of
                // the object is attempted.
                let message = match map.get("message") {
                    Some(found) => caught::text_value(found),
                    None => serialize_fallback(&map),
                };
                // The whole map moves into metadata, a `message` entry
                // included. The duplication mirrors what enumeration of the
                // source object produces and is kept deliberately.
                Ok(BaseError::new(message).with_metadata(map))
            }
            Caught::Value(Value::Array(items)) => {
                let message = serde_json::to_string(&items)
                    .unwrap_or_else(|_| UNSERIALIZABLE.to_string());
                let mut metadata = Metadata::new();
                for (index, item) in items.into_iter().enumerate() {
                    metadata.insert(index.to_string(), item);
                }
                Ok(BaseError::new(message).with_metadata(metadata))
            }
            Caught::Value(primitive) => Err(UnsupportedValue::new(primitive)),
        }
    }

    /// Flatten the error into a single mapping for downstream sinks.
    ///
    /// Metadata entries come first; the fixed keys `name`, `message`,
    /// `stackTrace` and `cause` are applied afterwards and win on collision.
    /// Key spelling follows the sink contract shared with the other
    /// consumers of these records.
    pub fn to_structured(&self) -> Metadata {
        let mut fields = self.metadata.clone();
        fields.insert("name".to_string(), Value::String(self.name.clone()));
        fields.insert("message".to_string(), Value::String(self.message.clone()));
        fields.insert(
            "stackTrace".to_string(),
            Value::String(self.stack.clone().unwrap_or_default()),
        );
        fields.insert(
            "cause".to_string(),
            self.cause
                .clone()
                .unwrap_or_else(|| Value::String(UNKNOWN_CAUSE.to_string())),
        );
        fields
    }

    /// Emit the error through the current tracing subscriber at error level.
    pub fn report(&self) {
        let metadata = Value::Object(self.metadata.clone());
        let cause = self
            .cause
            .as_ref()
            .map(caught::text_value)
            .unwrap_or_else(|| UNKNOWN_CAUSE.to_string());
        tracing::error!(
            target: "plinth_error",
            name = %self.name,
            metadata = %metadata,
            cause = %cause,
            "{}",
            self.message
        );
    }
}

impl fmt::Display for BaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (message: {} ", self.name, self.message)?;
        let mut entries = self.metadata.iter();
        if let Some((key, value)) = entries.next() {
            write!(f, "{}:{}", key, caught::text_value(value))?;
            for (key, value) in entries {
                write!(f, " {}:{}", key, caught::text_value(value))?;
            }
        }
        write!(f, ")")
    }
}

impl StdError for BaseError {}

const UNSERIALIZABLE: &str = "<unserializable>";

fn serialize_fallback(map: &Metadata) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| UNSERIALIZABLE.to_string())
}

fn capture_stack() -> Option<String> {
    let backtrace = Backtrace::force_capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(backtrace.to_string()),
        _ => None,
    }
}
