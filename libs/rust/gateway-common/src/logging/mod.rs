//! Structured, context-aware logging.
//!
//! Records carry a level, message, the handle's context label, the ambient
//! request id and sanitized metadata. They are fanned out to every
//! configured [`LogSink`].

pub mod file;
pub mod format;
pub mod level;
pub mod logger;
pub mod record;
pub mod sanitize;
pub mod sink;

pub use file::{RollingFileConfig, RollingFileSink};
pub use format::LogFormat;
pub use level::{LogLevel, ParseLevelError};
pub use logger::{LogConfig, Logger, LoggerBuilder, LoggerPort};
pub use record::{LogMetadata, LogRecord};
pub use sanitize::{REDACTED, SENSITIVE_KEYS, is_sensitive_key, sanitize};
pub use sink::{ConsoleSink, ConsoleStream, LogSink, MemorySink, TracingSink};
