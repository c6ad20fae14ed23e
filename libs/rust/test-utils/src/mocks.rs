//! Mock implementations for testing.
//!
//! [`ScriptedTransport`] replays canned outcomes in order and records every
//! request it receives, with the (tokio) instant it arrived. Under a paused
//! clock the gaps between instants are exactly the client's backoff delays.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gateway_common::http::{HttpTransport, RawResponse, TransportError, TransportRequest};
use gateway_common::logging::{LogLevel, Logger, MemorySink};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

/// A request seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// The request as sent
    pub request: TransportRequest,
    /// When it arrived
    pub at: Instant,
}

/// Transport that answers from a script.
///
/// Once the script is exhausted, every further call fails with a network
/// error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    outcomes: Arc<Mutex<VecDeque<Result<RawResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedTransport {
    /// Create a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with a JSON body.
    #[must_use]
    pub fn respond(self, status: u16, body: Value) -> Self {
        self.push(Ok(RawResponse::json(status, &body)));
        self
    }

    /// Queue a raw response.
    #[must_use]
    pub fn respond_raw(self, response: RawResponse) -> Self {
        self.push(Ok(response));
        self
    }

    /// Queue a network failure.
    #[must_use]
    pub fn fail_network(self, message: &str) -> Self {
        self.push(Err(TransportError::network(message)));
        self
    }

    /// Queue a timeout.
    #[must_use]
    pub fn fail_timeout(self, timeout: Duration) -> Self {
        self.push(Err(TransportError::Timeout(timeout)));
        self
    }

    /// Queue a failure raised before the request is sent.
    #[must_use]
    pub fn fail_other(self, message: &str) -> Self {
        self.push(Err(TransportError::Other(message.to_string())));
        self
    }

    fn push(&self, outcome: Result<RawResponse, TransportError>) {
        self.outcomes.lock().push_back(outcome);
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Gaps between consecutive requests.
    #[must_use]
    pub fn gaps(&self) -> Vec<Duration> {
        self.requests
            .lock()
            .windows(2)
            .map(|pair| pair[1].at.duration_since(pair[0].at))
            .collect()
    }

    /// Outcomes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.outcomes.lock().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().push(RecordedRequest {
            request,
            at: Instant::now(),
        });
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("scripted transport exhausted")))
    }
}

/// A logger at `level` writing into a fresh [`MemorySink`].
#[must_use]
pub fn capture_logger(level: LogLevel) -> (Logger, MemorySink) {
    let sink = MemorySink::new();
    let logger = Logger::builder().min_level(level).sink(sink.clone()).build();
    (logger, sink)
}
