//! Outbound HTTP.
//!
//! [`HttpClient`] layers retries, correlation-id propagation and logging on
//! top of an [`HttpTransport`]. The default transport is a pooled `reqwest`
//! client.

pub mod client;
pub mod config;
pub mod response;
pub mod transport;

pub use client::{HttpClient, HttpClientPort, REQUEST_ID_HEADER};
pub use config::{DEFAULT_TIMEOUT, HttpConfig, HttpRequestConfig, build_http_client, resolve_url};
pub use response::{HttpResponse, normalize_headers};
pub use transport::{
    HttpTransport, RawHeaderValue, RawResponse, ReqwestTransport, TransportError,
    TransportRequest, reason_phrase,
};
