//! Environment-driven configuration.
//!
//! Every setting has a default, so an empty environment yields a working
//! configuration. A `.env` file in the working directory is loaded first
//! when present.
//!
//! | Variable | Default |
//! |---|---|
//! | `APP_NAME` | `cms-gateway` |
//! | `LOG_LEVEL` | `info` |
//! | `LOG_FORMAT` | `pretty` |
//! | `LOG_COLORS` | `true` |
//! | `LOG_TO_FILE` | `false` |
//! | `LOG_DIR` | `logs` |
//! | `LOG_MAX_FILE_SIZE` | `20971520` |
//! | `LOG_MAX_FILE_AGE_DAYS` | `14` |
//! | `HTTP_BASE_URL` | unset |
//! | `HTTP_TIMEOUT_MS` | `30000` |
//! | `HTTP_RETRIES` | `3` |
//! | `HTTP_RETRY_DELAY_MS` | `1000` |
//! | `HTTP_CONNECT_TIMEOUT_MS` | `10000` |
//! | `HTTP_USER_AGENT` | `cms-gateway/1.0` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::http::HttpConfig;
use crate::logging::{LogConfig, LogFormat, LogLevel};

/// Configuration errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl {
        /// Variable name
        field: String,
        /// Parser message
        reason: String,
    },

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Variable name
        name: String,
        /// Parser message
        reason: String,
    },

    /// A value parsed but is out of range
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue {
        /// Variable name
        name: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Logger and HTTP client settings for one service.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Structured logger settings
    pub log: LogConfig,
    /// HTTP client defaults
    pub http: HttpConfig,
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_source(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but malformed.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let log = LogConfig {
            app_name: get("APP_NAME").unwrap_or(defaults.log.app_name),
            level: parse_var(&get, "LOG_LEVEL", defaults.log.level)?,
            format: parse_var(&get, "LOG_FORMAT", defaults.log.format)?,
            colors: parse_bool(&get, "LOG_COLORS", defaults.log.colors)?,
            to_file: parse_bool(&get, "LOG_TO_FILE", defaults.log.to_file)?,
            dir: get("LOG_DIR").map_or(defaults.log.dir, PathBuf::from),
            max_file_size: parse_var(&get, "LOG_MAX_FILE_SIZE", defaults.log.max_file_size)?,
            max_file_age_days: parse_var(
                &get,
                "LOG_MAX_FILE_AGE_DAYS",
                defaults.log.max_file_age_days,
            )?,
        };

        let http = HttpConfig {
            timeout: parse_millis(&get, "HTTP_TIMEOUT_MS", defaults.http.timeout)?,
            connect_timeout: parse_millis(
                &get,
                "HTTP_CONNECT_TIMEOUT_MS",
                defaults.http.connect_timeout,
            )?,
            retries: parse_var(&get, "HTTP_RETRIES", defaults.http.retries)?,
            retry_delay: parse_millis(&get, "HTTP_RETRY_DELAY_MS", defaults.http.retry_delay)?,
            user_agent: get("HTTP_USER_AGENT").unwrap_or(defaults.http.user_agent),
            base_url: get("HTTP_BASE_URL")
                .map(|url| validate_url("HTTP_BASE_URL", url))
                .transpose()?,
            ..defaults.http
        };

        let config = Self { log, http };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.log.app_name.trim().is_empty() {
            return Err(invalid("APP_NAME", "must not be empty"));
        }
        if self.http.timeout.is_zero() {
            return Err(invalid("HTTP_TIMEOUT_MS", "timeout must be greater than 0"));
        }
        if self.http.connect_timeout.is_zero() {
            return Err(invalid(
                "HTTP_CONNECT_TIMEOUT_MS",
                "timeout must be greater than 0",
            ));
        }
        if self.log.max_file_size == 0 {
            return Err(invalid("LOG_MAX_FILE_SIZE", "size must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(name: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a variable with a default value.
fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(val) => val.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_millis(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match get(name) {
        Some(_) => parse_var(get, name, 0u64).map(Duration::from_millis),
        None => Ok(default),
    }
}

/// `true`/`false`, also `1`/`0` and `yes`/`no`.
fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(val) = get(name) else {
        return Ok(default);
    };
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::ParseError {
            name: name.to_string(),
            reason: format!("expected a boolean, got `{other}`"),
        }),
    }
}

/// Check the URL parses; the original text is kept for concatenation.
fn validate_url(name: &str, url: String) -> Result<String, ConfigError> {
    Url::parse(&url).map_err(|e| ConfigError::InvalidUrl {
        field: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok(url)
}
