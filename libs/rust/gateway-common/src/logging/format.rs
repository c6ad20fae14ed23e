//! Record formatting for the console and file sinks.

use std::fmt::Write as _;
use std::str::FromStr;

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;

use super::{LogLevel, LogMetadata, LogRecord};

/// Output format for a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single human-readable line
    #[default]
    Pretty,
    /// One JSON object per record
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonRecord<'a> {
    timestamp: String,
    level: LogLevel,
    app: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<&'a str>,
    #[serde(skip_serializing_if = "LogMetadata::is_empty")]
    metadata: &'a LogMetadata,
}

/// Render `record` as a single-line JSON object stamped with `app`.
///
/// # Errors
///
/// Returns an error if the metadata cannot be serialized.
pub fn format_json(record: &LogRecord, app: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string(&JsonRecord {
        timestamp: record.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        level: record.level,
        app,
        context: record.context.as_deref(),
        request_id: record.request_id.as_deref(),
        message: &record.message,
        trace: record.trace.as_deref(),
        metadata: &record.metadata,
    })
}

/// Render `record` for humans:
/// `timestamp LEVEL [context] [request-id] message`, followed by the trace
/// on its own lines and the metadata as trailing JSON.
#[must_use]
pub fn format_pretty(record: &LogRecord, colors: bool) -> String {
    let mut line = record
        .timestamp
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string();

    let label = format!("{:<7}", record.level.as_str().to_uppercase());
    line.push(' ');
    if colors {
        line.push_str(&colorize(record.level, &label));
    } else {
        line.push_str(&label);
    }

    if let Some(context) = &record.context {
        let _ = write!(line, " [{context}]");
    }
    if let Some(request_id) = &record.request_id {
        let _ = write!(line, " [{request_id}]");
    }
    line.push(' ');
    line.push_str(&record.message);

    if let Some(trace) = &record.trace {
        line.push('\n');
        line.push_str(trace);
    }

    if !record.metadata.is_empty() {
        let meta = Value::Object(record.metadata.clone());
        line.push(' ');
        line.push_str(&meta.to_string());
    }

    line
}

fn colorize(level: LogLevel, label: &str) -> String {
    match level {
        LogLevel::Error => label.red().to_string(),
        LogLevel::Warn => label.yellow().to_string(),
        LogLevel::Info => label.green().to_string(),
        LogLevel::Http => label.magenta().to_string(),
        LogLevel::Debug => label.blue().to_string(),
        LogLevel::Verbose => label.cyan().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LogRecord {
        LogRecord::new(LogLevel::Warn, "upstream slow")
            .with_context("HttpClient")
            .with_request_id("req-42")
            .with_metadata("status", 503)
    }

    #[test]
    fn test_json_fields() {
        let line = format_json(&sample(), "cms-gateway").unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["level"], "warn");
        assert_eq!(parsed["app"], "cms-gateway");
        assert_eq!(parsed["context"], "HttpClient");
        assert_eq!(parsed["requestId"], "req-42");
        assert_eq!(parsed["message"], "upstream slow");
        assert_eq!(parsed["metadata"]["status"], 503);
        assert!(parsed["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let record = LogRecord::new(LogLevel::Info, "boot");
        let parsed: Value = serde_json::from_str(&format_json(&record, "app").unwrap()).unwrap();
        assert!(parsed.get("context").is_none());
        assert!(parsed.get("requestId").is_none());
        assert!(parsed.get("trace").is_none());
        assert!(parsed.get("metadata").is_none());
    }

    #[test]
    fn test_pretty_plain() {
        let line = format_pretty(&sample(), false);
        assert!(line.contains("WARN"));
        assert!(line.contains("[HttpClient] [req-42] upstream slow"));
        assert!(line.ends_with(r#"{"status":503}"#));
    }

    #[test]
    fn test_pretty_with_trace() {
        let record = LogRecord::new(LogLevel::Error, "failed").with_trace("at handler\nat main");
        let line = format_pretty(&record, false);
        assert!(line.contains("failed\nat handler\nat main"));
    }

    #[test]
    fn test_pretty_colors_add_escape_codes() {
        let line = format_pretty(&sample(), true);
        assert!(line.contains("\u{1b}["));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
