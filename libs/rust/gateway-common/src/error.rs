//! Error types shared by the gateway core.
//!
//! [`HttpClientError`] is the single failure shape returned by the HTTP
//! client once its retry policy is exhausted. [`SinkError`] covers failures
//! inside log sinks; the logger swallows these so they never reach callers.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed underlying cause of an [`HttpClientError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure class of an [`HttpClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response was received (connection refused, DNS failure, timeout)
    Network,
    /// A response arrived with a non-2xx status
    Response,
    /// Failed outside the exchange: body serialization, response decoding
    /// or a request the transport rejected
    Other,
}

/// Normalized failure of an outbound HTTP call.
///
/// `status` is set only for [`FailureKind::Response`].
#[derive(Error, Debug)]
#[error("{message}")]
pub struct HttpClientError {
    /// Human-readable failure message
    pub message: String,
    /// Failure class
    pub kind: FailureKind,
    /// HTTP status of the final response, if one was received
    pub status: Option<u16>,
    /// Raw error body of the final response, if any
    pub data: Option<serde_json::Value>,
    /// Underlying cause
    #[source]
    pub cause: Option<BoxError>,
}

impl HttpClientError {
    /// Create an error with only a message, classed [`FailureKind::Other`].
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Other,
            status: None,
            data: None,
            cause: None,
        }
    }

    /// Create an error for an exchange that never got a response.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Network,
            ..Self::new(message)
        }
    }

    /// Attach the response status; the error becomes a
    /// [`FailureKind::Response`].
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.kind = FailureKind::Response;
        self.status = Some(status);
        self
    }

    /// Attach the raw response body.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// 4xx response.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self.status, Some(400..=499))
    }

    /// 5xx response.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self.status, Some(s) if s >= 500)
    }

    /// No response was received.
    #[must_use]
    pub fn is_network_error(&self) -> bool {
        self.kind == FailureKind::Network
    }

    /// Whether the failure class is one the client retries.
    ///
    /// # Examples
    ///
    /// ```
    /// use gateway_common::HttpClientError;
    ///
    /// assert!(HttpClientError::new("busy").with_status(429).is_retryable());
    /// assert!(!HttpClientError::new("missing").with_status(404).is_retryable());
    /// assert!(HttpClientError::network("refused").is_retryable());
    /// assert!(!HttpClientError::new("bad body").is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match (self.kind, self.status) {
            (FailureKind::Network, _) => true,
            (FailureKind::Response, Some(status)) => crate::retry::is_retryable_status(status),
            (FailureKind::Response | FailureKind::Other, _) => false,
        }
    }
}

/// Failure inside a log sink.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Writing to the underlying stream or file failed
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The record could not be serialized
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
