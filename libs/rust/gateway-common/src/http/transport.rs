//! The transport seam under [`HttpClient`](super::HttpClient).
//!
//! A transport performs exactly one round-trip and reports what happened.
//! Every response, whatever its status, comes back as `Ok`; only a call
//! that never produced a response is an `Err`.

use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use reqwest::Client;
use reqwest::header::HeaderMap;
use thiserror::Error;

use super::config::{HttpConfig, build_http_client};
use crate::error::BoxError;

/// One outbound attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// HTTP method
    pub method: Method,
    /// Fully resolved URL
    pub url: String,
    /// Request headers, already merged
    pub headers: Vec<(String, String)>,
    /// Query parameters
    pub params: Vec<(String, String)>,
    /// JSON body
    pub body: Option<serde_json::Value>,
    /// Attempt timeout
    pub timeout: Duration,
}

impl TransportRequest {
    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response header value as the transport saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawHeaderValue {
    /// Single textual value
    Text(String),
    /// Repeated header, one entry per occurrence
    List(Vec<String>),
    /// Value that is not valid text
    Opaque(Vec<u8>),
}

/// What came back from one round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Status code
    pub status: u16,
    /// Reason phrase
    pub status_text: String,
    /// Headers in arrival order
    pub headers: Vec<(String, RawHeaderValue)>,
    /// Body bytes
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Response with a status and JSON body, reason phrase filled in.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            status_text: reason_phrase(status),
            headers: vec![(
                "content-type".to_string(),
                RawHeaderValue::Text("application/json".to_string()),
            )],
            body: body.to_string().into_bytes(),
        }
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: RawHeaderValue) -> Self {
        self.headers.push((name.into(), value));
        self
    }
}

/// Canonical reason phrase for `status`, empty when unknown.
#[must_use]
pub fn reason_phrase(status: u16) -> String {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string()
}

/// A round-trip that produced no response.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection, DNS or I/O failure
    #[error("{message}")]
    Network {
        /// Failure message
        message: String,
        /// Underlying error
        #[source]
        source: Option<BoxError>,
    },

    /// The attempt exceeded its timeout
    #[error("timeout of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),

    /// Failure before the request left the process (bad URL, bad body)
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Network error with only a message.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// No response was received, so the failure is network-classified.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout(_))
    }
}

/// Performs single HTTP round-trips.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request.
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError>;
}

/// [`HttpTransport`] over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport from client settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        let timeout = request.timeout;
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .timeout(timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body).map_err(|e| TransportError::Other(e.to_string()))?;
            builder = builder.body(bytes);
        }

        let response = builder.send().await.map_err(|e| classify(e, timeout))?;
        let status = response.status();
        let headers = collect_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(e, timeout))?
            .to_vec();

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_builder() {
        TransportError::Other(err.to_string())
    } else {
        TransportError::Network {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Group repeated headers; values that are not visible ASCII become opaque.
fn collect_headers(map: &HeaderMap) -> Vec<(String, RawHeaderValue)> {
    map.keys()
        .map(|name| {
            let values: Vec<_> = map.get_all(name).iter().collect();
            let texts: Option<Vec<String>> = values
                .iter()
                .map(|v| v.to_str().ok().map(str::to_string))
                .collect();
            let value = match texts {
                Some(mut texts) if texts.len() == 1 => RawHeaderValue::Text(texts.remove(0)),
                Some(texts) => RawHeaderValue::List(texts),
                None => RawHeaderValue::Opaque(
                    values.first().map(|v| v.as_bytes().to_vec()).unwrap_or_default(),
                ),
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}
