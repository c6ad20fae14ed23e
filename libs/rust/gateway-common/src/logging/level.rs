//! Log levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Log level, ordered from most to least severe.
///
/// `Error < Warn < ... < Verbose` in the derived ordering, so a record is
/// enabled when `record_level <= min_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level
    Info,
    /// Inbound/outbound HTTP traffic
    Http,
    /// Debug level
    Debug,
    /// Verbose level
    Verbose,
}

impl LogLevel {
    /// All levels, most severe first.
    pub const ALL: [Self; 6] = [
        Self::Error,
        Self::Warn,
        Self::Info,
        Self::Http,
        Self::Debug,
        Self::Verbose,
    ];

    /// Convert to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Http => "http",
            Self::Debug => "debug",
            Self::Verbose => "verbose",
        }
    }

    /// Whether a record at this level passes a `min` threshold.
    #[must_use]
    pub fn is_enabled(self, min: Self) -> bool {
        self <= min
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown level name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" | "log" => Ok(Self::Info),
            "http" => Ok(Self::Http),
            "debug" => Ok(Self::Debug),
            "verbose" | "trace" => Ok(Self::Verbose),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}
