//! Retry policy with linear backoff.
//!
//! Each outbound attempt ends in an [`AttemptFailure`] or a success. The
//! decision to try again is a pure function of the failure class and the
//! attempt count, independent of how the transport reports errors.

use std::time::Duration;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 3;

/// Default backoff base delay.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Retry policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Number of retries after the first attempt
    pub retries: u32,
    /// Base delay; retry `n` waits `n * base_delay`
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            base_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with a custom retry count.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Create a new retry config with a custom base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }
}

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    /// The transport reported the failure. `status` is `None` when no
    /// response was received at all.
    Transport {
        /// Response status, if a response arrived
        status: Option<u16>,
        /// Response body, if any
        body: Option<serde_json::Value>,
        /// Failure message
        message: String,
    },
    /// Anything outside the transport (serialization, decoding).
    Other {
        /// Failure message
        message: String,
    },
}

impl AttemptFailure {
    /// Status of the failed response, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Other { .. } => None,
        }
    }

    /// Failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Transport { message, .. } | Self::Other { message } => message,
        }
    }

    /// Whether this failure class may succeed on a later attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(status),
                ..
            } => is_retryable_status(*status),
            Self::Other { .. } => false,
        }
    }
}

/// 5xx and 429 are retried; every other status is terminal.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 429
}

/// Retry policy for outbound calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Total attempts allowed, first attempt included.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.config.retries.saturating_add(1)
    }

    /// Number of retries after the first attempt.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.config.retries
    }

    /// Delay before retry number `retry` (1-based): `retry * base_delay`.
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.config.base_delay.saturating_mul(retry)
    }

    /// Check if a failed attempt should be retried.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed.
    #[must_use]
    pub fn should_retry(&self, failure: &AttemptFailure, attempt: u32) -> bool {
        should_retry(failure, attempt, self.max_attempts())
    }
}

/// Pure retry decision: attempts remain and the failure class is transient.
#[must_use]
pub fn should_retry(failure: &AttemptFailure, attempt: u32, max_attempts: u32) -> bool {
    attempt < max_attempts && failure.is_retryable()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(status: Option<u16>) -> AttemptFailure {
        AttemptFailure::Transport {
            status,
            body: None,
            message: "failed".to_string(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.retries, 3);
        assert_eq!(config.base_delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_linear_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(3000));
    }

    #[test]
    fn test_custom_base_delay() {
        let policy = RetryPolicy::new(
            RetryConfig::default().with_base_delay(Duration::from_millis(250)),
        );
        assert_eq!(policy.delay_for_retry(4), Duration::from_millis(1000));
    }

    #[test]
    fn test_max_attempts() {
        assert_eq!(RetryPolicy::default().max_attempts(), 4);
        let policy = RetryPolicy::new(RetryConfig::default().with_retries(0));
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::default();

        // Retryable within limit
        assert!(policy.should_retry(&transport(None), 1));
        assert!(policy.should_retry(&transport(Some(500)), 3));
        assert!(policy.should_retry(&transport(Some(429)), 2));

        // At limit
        assert!(!policy.should_retry(&transport(Some(503)), 4));

        // Terminal statuses
        assert!(!policy.should_retry(&transport(Some(400)), 1));
        assert!(!policy.should_retry(&transport(Some(404)), 1));
    }

    #[test]
    fn test_other_failures_not_retried() {
        let failure = AttemptFailure::Other {
            message: "decode".to_string(),
        };
        assert!(!should_retry(&failure, 1, 4));
        assert_eq!(failure.status(), None);
    }

    #[test]
    fn test_zero_retries_never_retries() {
        assert!(!should_retry(&transport(None), 1, 1));
    }
}
