//! `tracing-subscriber` setup.
//!
//! Records routed through [`crate::logging::TracingSink`] and the crate's
//! own diagnostics end up in whatever subscriber is installed here.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::logging::{LogConfig, LogFormat, LogLevel};

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter
    pub log_level: String,
    /// Whether to output JSON format
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Derive a tracing config matching the structured logger settings.
    #[must_use]
    pub fn from_log_config(config: &LogConfig) -> Self {
        Self {
            log_level: filter_directive(config.level).to_string(),
            json_output: config.format == LogFormat::Json,
        }
    }

    /// Create config with custom log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON output.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// `EnvFilter` directive for a gateway level.
#[must_use]
pub const fn filter_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info | LogLevel::Http => "info",
        LogLevel::Debug => "debug",
        LogLevel::Verbose => "trace",
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_level`. Call once at
/// startup.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    }
}
