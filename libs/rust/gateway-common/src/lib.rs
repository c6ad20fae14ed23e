//! Shared library for cross-cutting concerns in cms-gateway Rust services.
//!
//! This crate provides centralized implementations for:
//! - Per-request correlation context carried across async boundaries
//! - Structured logging with sanitization, console and rotating file output
//! - A resilient HTTP client with linear-backoff retries
//! - Tower middleware that opens a correlation scope per inbound request
//! - Environment-driven configuration and tracing setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod retry;
pub mod tracing_config;

pub use config::{ConfigError, GatewayConfig};
pub use context::{RequestContext, spawn_with_context};
pub use error::{FailureKind, HttpClientError, SinkError};
pub use http::{
    HttpClient, HttpClientPort, HttpConfig, HttpRequestConfig, HttpResponse, HttpTransport,
    ReqwestTransport, build_http_client,
};
pub use logging::{LogConfig, LogFormat, LogLevel, LogRecord, Logger, LoggerPort};
pub use middleware::{RequestIdLayer, RequestIdService};
pub use retry::{AttemptFailure, RetryConfig, RetryPolicy};
pub use tracing_config::{TracingConfig, init_tracing};
