//! Harness for the cms-gateway integration tests.
//!
//! Wires an [`HttpClient`] to a transport and a capturing logger, the way a
//! service would at startup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use gateway_common::http::{HttpClient, HttpConfig, HttpTransport};
use gateway_common::logging::{LogLevel, LogRecord, MemorySink};
use test_utils::capture_logger;

/// Base delay used by harness clients.
pub const BASE_DELAY: Duration = Duration::from_millis(1000);

/// A client plus the sink its logger writes to.
#[derive(Debug, Clone)]
pub struct Harness {
    /// Client under test
    pub client: HttpClient,
    /// Every record the client logged
    pub sink: MemorySink,
}

impl Harness {
    /// Client over `transport`, logging everything.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_config(HttpConfig::default().with_retry_delay(BASE_DELAY), transport)
    }

    /// Client over `transport` with explicit defaults.
    #[must_use]
    pub fn with_config(config: HttpConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let (logger, sink) = capture_logger(LogLevel::Verbose);
        let client = HttpClient::with_transport(config, transport).with_logger(&logger);
        tracing::debug!("integration harness ready");
        Self { client, sink }
    }

    /// Records at `level`.
    #[must_use]
    pub fn logged(&self, level: LogLevel) -> Vec<LogRecord> {
        self.sink.at_level(level)
    }

    /// Records at `level` whose message contains `needle`.
    #[must_use]
    pub fn logged_containing(&self, level: LogLevel, needle: &str) -> Vec<LogRecord> {
        self.logged(level)
            .into_iter()
            .filter(|r| r.message.contains(needle))
            .collect()
    }
}
