//! Redaction of sensitive metadata.

use serde_json::{Map, Value};

/// Replacement for redacted values.
pub const REDACTED: &str = "[REDACTED]";

/// Lower-cased key fragments whose values are always redacted.
pub const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "apikey",
    "api_key",
    "authorization",
    "accesstoken",
    "access_token",
    "refreshtoken",
    "refresh_token",
    "creditcard",
    "credit_card",
    "cardnumber",
    "card_number",
    "cvv",
    "ssn",
    "pin",
];

/// Whether a metadata key names a sensitive field.
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|fragment| lower.contains(fragment))
}

/// Return a copy of `value` with every sensitive key's value redacted,
/// at any depth.
#[must_use]
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}

/// [`sanitize`] for a metadata map.
#[must_use]
pub fn sanitize_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let cleaned = if is_sensitive_key(key) {
                Value::String(REDACTED.to_string())
            } else {
                sanitize(value)
            };
            (key.clone(), cleaned)
        })
        .collect()
}
