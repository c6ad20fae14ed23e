//! Log sinks.
//!
//! A sink receives fully built, sanitized records. Each `write` call must
//! emit the record atomically; the logger calls sinks from many tasks at
//! once.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};

use super::format::{format_json, format_pretty, LogFormat};
use super::{LogLevel, LogRecord};
use crate::error::SinkError;

/// Destination for log records.
pub trait LogSink: Send + Sync {
    /// Write one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be written.
    fn write(&self, record: &LogRecord) -> Result<(), SinkError>;

    /// Flush buffered output. The default does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the underlying stream fails.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Which standard stream a [`ConsoleSink`] writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleStream {
    /// Standard output
    #[default]
    Stdout,
    /// Standard error
    Stderr,
}

/// Console sink in pretty or JSON format.
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    format: LogFormat,
    colors: bool,
    app_name: String,
    stream: ConsoleStream,
}

impl ConsoleSink {
    /// Create a console sink writing to stdout.
    #[must_use]
    pub fn new(format: LogFormat, app_name: impl Into<String>) -> Self {
        Self {
            format,
            colors: true,
            app_name: app_name.into(),
            stream: ConsoleStream::Stdout,
        }
    }

    /// Enable or disable ANSI colors in pretty mode.
    #[must_use]
    pub const fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Write to a different standard stream.
    #[must_use]
    pub const fn with_stream(mut self, stream: ConsoleStream) -> Self {
        self.stream = stream;
        self
    }

    fn render(&self, record: &LogRecord) -> Result<String, SinkError> {
        let mut line = match self.format {
            LogFormat::Json => format_json(record, &self.app_name)?,
            LogFormat::Pretty => format_pretty(record, self.colors),
        };
        line.push('\n');
        Ok(line)
    }
}

impl LogSink for ConsoleSink {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        let line = self.render(record)?;
        // One write_all per record under the stream lock keeps lines whole.
        match self.stream {
            ConsoleStream::Stdout => std::io::stdout().lock().write_all(line.as_bytes())?,
            ConsoleStream::Stderr => std::io::stderr().lock().write_all(line.as_bytes())?,
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        match self.stream {
            ConsoleStream::Stdout => std::io::stdout().lock().flush()?,
            ConsoleStream::Stderr => std::io::stderr().lock().flush()?,
        }
        Ok(())
    }
}

/// Forwards records to the `tracing` ecosystem.
///
/// Lets a host that already runs a `tracing-subscriber` stack receive
/// gateway records through it. `http` maps to `info` and `verbose` to
/// `trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        let context = record.context.as_deref().unwrap_or("-");
        let request_id = record.request_id.as_deref().unwrap_or("-");
        let metadata = serde_json::Value::Object(record.metadata.clone());

        match record.level {
            LogLevel::Error => error!(
                context,
                request_id,
                trace = record.trace.as_deref(),
                metadata = %metadata,
                "{}",
                record.message
            ),
            LogLevel::Warn => warn!(context, request_id, metadata = %metadata, "{}", record.message),
            LogLevel::Info => info!(context, request_id, metadata = %metadata, "{}", record.message),
            LogLevel::Http => info!(
                context,
                request_id,
                http = true,
                metadata = %metadata,
                "{}",
                record.message
            ),
            LogLevel::Debug => debug!(context, request_id, metadata = %metadata, "{}", record.message),
            LogLevel::Verbose => trace!(context, request_id, metadata = %metadata, "{}", record.message),
        }
        Ok(())
    }
}

/// Keeps records in memory. Cloning shares the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record written so far.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records at `level`.
    #[must_use]
    pub fn at_level(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }

    /// Number of records written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// No records written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drop all captured records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn write(&self, record: &LogRecord) -> Result<(), SinkError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
