//! The structured logger.
//!
//! [`Logger`] is a cheap handle: a shared core (minimum level and sinks)
//! plus an optional context label. [`Logger::set_context`] returns a new
//! handle over the same core, so labels never leak between components.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use super::file::{RollingFileConfig, RollingFileSink};
use super::format::LogFormat;
use super::record::into_metadata;
use super::sanitize::sanitize_map;
use super::sink::{ConsoleSink, LogSink};
use super::{LogLevel, LogRecord};
use crate::context;
use crate::error::SinkError;

/// Logging port used by the rest of the application.
///
/// Level methods take a message, an optional trace, and optional metadata
/// (normally a JSON object). They never fail.
pub trait LoggerPort: Send + Sync {
    /// A handle bound to `label`; the receiver is left unchanged.
    fn set_context(&self, label: &str) -> Arc<dyn LoggerPort>;

    /// Emit one record at `level`.
    fn log(&self, level: LogLevel, message: &str, trace: Option<&str>, metadata: Option<Value>);

    /// Log at `error`.
    fn error(&self, message: &str, trace: Option<&str>, metadata: Option<Value>) {
        self.log(LogLevel::Error, message, trace, metadata);
    }

    /// Log at `warn`.
    fn warn(&self, message: &str, trace: Option<&str>, metadata: Option<Value>) {
        self.log(LogLevel::Warn, message, trace, metadata);
    }

    /// Log at `info`.
    fn info(&self, message: &str, trace: Option<&str>, metadata: Option<Value>) {
        self.log(LogLevel::Info, message, trace, metadata);
    }

    /// Log at `http`.
    fn http(&self, message: &str, trace: Option<&str>, metadata: Option<Value>) {
        self.log(LogLevel::Http, message, trace, metadata);
    }

    /// Log at `debug`.
    fn debug(&self, message: &str, trace: Option<&str>, metadata: Option<Value>) {
        self.log(LogLevel::Debug, message, trace, metadata);
    }

    /// Log at `verbose`.
    fn verbose(&self, message: &str, trace: Option<&str>, metadata: Option<Value>) {
        self.log(LogLevel::Verbose, message, trace, metadata);
    }
}

/// Logger configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level emitted
    pub level: LogLevel,
    /// Console output format
    pub format: LogFormat,
    /// Colorize pretty output
    pub colors: bool,
    /// Mirror records to rotating files
    pub to_file: bool,
    /// Directory for log files
    pub dir: PathBuf,
    /// Application name for JSON records and file names
    pub app_name: String,
    /// Size cap per file before a same-day roll
    pub max_file_size: u64,
    /// Retention for log files
    pub max_file_age_days: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            colors: true,
            to_file: false,
            dir: PathBuf::from("logs"),
            app_name: "cms-gateway".to_string(),
            max_file_size: 20 * 1024 * 1024,
            max_file_age_days: 14,
        }
    }
}

impl LogConfig {
    /// Create config with custom level.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Create config with custom console format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Create config with custom app name.
    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable file output into `dir`.
    #[must_use]
    pub fn with_file_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.to_file = true;
        self.dir = dir.into();
        self
    }

    /// Disable ANSI colors.
    #[must_use]
    pub const fn without_colors(mut self) -> Self {
        self.colors = false;
        self
    }
}

struct LoggerCore {
    min_level: LogLevel,
    sinks: Vec<Box<dyn LogSink>>,
}

/// Structured logger handle.
#[derive(Clone)]
pub struct Logger {
    core: Arc<LoggerCore>,
    context: Option<Arc<str>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("min_level", &self.core.min_level)
            .field("sinks", &self.core.sinks.len())
            .field("context", &self.context)
            .finish()
    }
}

/// Builder for [`Logger`].
pub struct LoggerBuilder {
    min_level: LogLevel,
    sinks: Vec<Box<dyn LogSink>>,
}

impl LoggerBuilder {
    /// Set the minimum level.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Add a sink.
    #[must_use]
    pub fn sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Build the logger.
    #[must_use]
    pub fn build(self) -> Logger {
        Logger {
            core: Arc::new(LoggerCore {
                min_level: self.min_level,
                sinks: self.sinks,
            }),
            context: None,
        }
    }
}

impl Logger {
    /// Start building a logger with no sinks at `info`.
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder {
            min_level: LogLevel::Info,
            sinks: Vec::new(),
        }
    }

    /// A logger that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self::builder().build()
    }

    /// Build the console sink and, when enabled, the rotating file sinks
    /// (`{app}-DATE.log` for every record, `{app}-error-DATE.log` for errors).
    ///
    /// # Errors
    ///
    /// Returns an error if the log directory cannot be created.
    pub fn from_config(config: &LogConfig) -> Result<Self, SinkError> {
        let mut builder = Self::builder().min_level(config.level).sink(
            ConsoleSink::new(config.format, &config.app_name).with_colors(config.colors),
        );

        if config.to_file {
            let all = RollingFileConfig::new(&config.dir, &config.app_name)
                .with_max_size(config.max_file_size)
                .with_max_age_days(config.max_file_age_days);
            let errors = RollingFileConfig::new(&config.dir, format!("{}-error", config.app_name))
                .with_app_name(&config.app_name)
                .with_max_size(config.max_file_size)
                .with_max_age_days(config.max_file_age_days)
                .with_max_level(LogLevel::Error);
            builder = builder
                .sink(RollingFileSink::new(all)?)
                .sink(RollingFileSink::new(errors)?);
            tracing::debug!(dir = %config.dir.display(), "file logging enabled");
        }

        Ok(builder.build())
    }

    /// A handle over the same sinks bound to `label`.
    #[must_use]
    pub fn set_context(&self, label: impl Into<String>) -> Self {
        Self {
            core: Arc::clone(&self.core),
            context: Some(Arc::from(label.into())),
        }
    }

    /// The bound context label.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// The minimum level emitted.
    #[must_use]
    pub fn min_level(&self) -> LogLevel {
        self.core.min_level
    }

    /// Whether a record at `level` would be emitted.
    #[must_use]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.is_enabled(self.core.min_level)
    }

    /// Flush every sink, ignoring failures.
    pub fn flush(&self) {
        for sink in &self.core.sinks {
            let _ = sink.flush();
        }
    }

    fn build_record(
        &self,
        level: LogLevel,
        message: &str,
        trace: Option<&str>,
        metadata: Option<Value>,
    ) -> LogRecord {
        let mut record = LogRecord::new(level, message);
        record.context = self.context.as_deref().map(str::to_string);
        record.request_id = context::request_id();
        record.trace = trace.map(str::to_string);
        if let Some(metadata) = metadata {
            record.metadata = sanitize_map(&into_metadata(metadata));
        }
        record
    }
}

impl LoggerPort for Logger {
    fn set_context(&self, label: &str) -> Arc<dyn LoggerPort> {
        Arc::new(Self::set_context(self, label))
    }

    fn log(&self, level: LogLevel, message: &str, trace: Option<&str>, metadata: Option<Value>) {
        if !self.is_enabled(level) || self.core.sinks.is_empty() {
            return;
        }
        let record = self.build_record(level, message, trace, metadata);
        for sink in &self.core.sinks {
            // Sink failures never reach the caller.
            let _ = sink.write(&record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::logging::{MemorySink, REDACTED};
    use serde_json::json;

    struct FailingSink;

    impl LogSink for FailingSink {
        fn write(&self, _record: &LogRecord) -> Result<(), SinkError> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    fn capture(level: LogLevel) -> (Logger, MemorySink) {
        let sink = MemorySink::new();
        let logger = Logger::builder().min_level(level).sink(sink.clone()).build();
        (logger, sink)
    }

    #[test]
    fn test_level_filtering() {
        let (logger, sink) = capture(LogLevel::Info);
        logger.error("e", None, None);
        logger.info("i", None, None);
        logger.http("h", None, None);
        logger.debug("d", None, None);

        let levels: Vec<_> = sink.records().iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![LogLevel::Error, LogLevel::Info]);
    }

    #[test]
    fn test_set_context_returns_independent_handle() {
        let (logger, sink) = capture(LogLevel::Verbose);
        let labelled = logger.set_context("UserService");

        labelled.info("from labelled", None, None);
        logger.info("from original", None, None);

        let records = sink.records();
        assert_eq!(records[0].context.as_deref(), Some("UserService"));
        assert_eq!(records[1].context, None);
        assert_eq!(logger.context(), None);
    }

    #[test]
    fn test_set_context_replaces_label() {
        let (logger, sink) = capture(LogLevel::Info);
        let relabelled = logger.set_context("First").set_context("Second");
        relabelled.info("x", None, None);
        assert_eq!(sink.records()[0].context.as_deref(), Some("Second"));
    }

    #[test]
    fn test_port_set_context() {
        let (logger, sink) = capture(LogLevel::Info);
        let port: Arc<dyn LoggerPort> = Arc::new(logger);
        let child = port.set_context("Port");
        child.warn("w", None, None);
        port.warn("w", None, None);

        let records = sink.records();
        assert_eq!(records[0].context.as_deref(), Some("Port"));
        assert_eq!(records[1].context, None);
    }

    #[test]
    fn test_metadata_is_sanitized() {
        let (logger, sink) = capture(LogLevel::Info);
        logger.info(
            "login",
            None,
            Some(json!({"password": "x", "nested": {"token": "y", "ok": "z"}})),
        );

        let record = &sink.records()[0];
        assert_eq!(record.metadata["password"], REDACTED);
        assert_eq!(record.metadata["nested"]["token"], REDACTED);
        assert_eq!(record.metadata["nested"]["ok"], "z");
    }

    #[test]
    fn test_trace_recorded() {
        let (logger, sink) = capture(LogLevel::Info);
        logger.error("boom", Some("stack line"), None);
        assert_eq!(sink.records()[0].trace.as_deref(), Some("stack line"));
    }

    #[tokio::test]
    async fn test_request_id_stamped_from_context() {
        let (logger, sink) = capture(LogLevel::Info);
        context::run(RequestContext::new("req-7"), async {
            logger.info("inside", None, None);
        })
        .await;
        logger.info("outside", None, None);

        let records = sink.records();
        assert_eq!(records[0].request_id.as_deref(), Some("req-7"));
        assert_eq!(records[1].request_id, None);
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        let sink = MemorySink::new();
        let logger = Logger::builder()
            .sink(FailingSink)
            .sink(sink.clone())
            .build();
        logger.error("still delivered", None, None);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_noop_logger() {
        let logger = Logger::noop();
        logger.error("dropped", None, None);
        logger.flush();
    }

    #[test]
    fn test_from_config_with_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::default()
            .with_level(LogLevel::Debug)
            .with_format(LogFormat::Json)
            .with_app_name("gateway-test")
            .with_file_output(dir.path());
        let logger = Logger::from_config(&config).unwrap();
        assert_eq!(logger.min_level(), LogLevel::Debug);

        logger.error("bad thing", None, None);
        logger.info("fine thing", None, None);
        logger.flush();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("gateway-test-error-")));
        assert!(names.iter().any(|n| n.starts_with("gateway-test-2")));
    }
}
