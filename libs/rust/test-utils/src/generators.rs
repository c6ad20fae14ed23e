//! Shared proptest generators for cms-gateway libraries.

use gateway_common::logging::LogLevel;
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::time::Duration;

/// Generate request ids, both UUID-shaped and free-form.
pub fn request_id_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}",
        "req-[a-z0-9]{4,16}",
    ]
}

/// Generate keys that must be redacted, in assorted casings.
pub fn sensitive_key_strategy() -> impl Strategy<Value = String> {
    (
        prop_oneof![
            Just("password"),
            Just("token"),
            Just("secret"),
            Just("apiKey"),
            Just("Authorization"),
            Just("refresh_token"),
            Just("creditCard"),
            Just("cvv"),
        ],
        "[a-z]{0,4}",
    )
        .prop_map(|(fragment, prefix)| format!("{prefix}{fragment}"))
}

/// Generate keys with no sensitive fragment.
pub fn plain_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("userId".to_string()),
        Just("email".to_string()),
        Just("path".to_string()),
        Just("status".to_string()),
        Just("durationMs".to_string()),
        Just("locale".to_string()),
    ]
}

/// Generate nested metadata objects mixing plain and sensitive keys.
pub fn metadata_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<u32>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ];
    let key = prop_oneof![plain_key_strategy(), sensitive_key_strategy()].boxed();
    let tree = leaf.prop_recursive(3, 32, 4, move |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
            prop::collection::btree_map(key.clone(), inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    });
    prop::collection::btree_map(
        prop_oneof![plain_key_strategy(), sensitive_key_strategy()],
        tree,
        0..5,
    )
    .prop_map(|m| Value::Object(m.into_iter().collect()))
}

/// Generate log levels.
pub fn log_level_strategy() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

/// Generate statuses the client retries (5xx and 429).
pub fn retryable_status_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![Just(429u16), 500u16..600]
}

/// Generate statuses the client gives up on immediately.
pub fn terminal_status_strategy() -> impl Strategy<Value = u16> {
    (400u16..500).prop_filter("429 is retryable", |s| *s != 429)
}

/// Generate valid HTTP status codes.
pub fn http_status_code_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(200u16),
        Just(201u16),
        Just(204u16),
        Just(400u16),
        Just(401u16),
        Just(403u16),
        Just(404u16),
        Just(429u16),
        Just(500u16),
        Just(502u16),
        Just(503u16),
    ]
}

/// Generate backoff base delays (1ms to 2s).
pub fn retry_delay_strategy() -> impl Strategy<Value = Duration> {
    (1u64..2_000).prop_map(Duration::from_millis)
}

/// Generate API paths.
pub fn api_path_strategy() -> impl Strategy<Value = String> {
    "(/[a-z][a-z0-9-]{0,10}){1,4}"
}
