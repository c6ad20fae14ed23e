//! Log records.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::LogLevel;

/// Metadata attached to a record.
pub type LogMetadata = Map<String, Value>;

/// One structured log event, after sanitization.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Label of the emitting component
    pub context: Option<String>,
    /// Correlation ID of the request being served
    pub request_id: Option<String>,
    /// Stack trace or error chain
    pub trace: Option<String>,
    /// Sanitized metadata
    pub metadata: LogMetadata,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    /// Create a new record stamped with the current time.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            context: None,
            request_id: None,
            trace: None,
            metadata: Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// Add context label.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add correlation ID.
    #[must_use]
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Add trace.
    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    /// Add one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Metadata value by key.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

/// Turn caller-supplied metadata into a map.
///
/// Objects are used as-is, `null` means no metadata, and any other value is
/// kept under a `value` key.
#[must_use]
pub fn into_metadata(value: Value) -> LogMetadata {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
