//! Client-wide defaults and per-call configuration.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::retry::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, RetryConfig};

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// HTTP client configuration.
///
/// Transport settings (connect timeout, pooling, user agent) plus the
/// defaults every call falls back to when its [`HttpRequestConfig`] leaves a
/// field unset.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-attempt timeout (default: 30s)
    pub timeout: Duration,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
    /// Retries after the first attempt (default: 3)
    pub retries: u32,
    /// Linear backoff base (default: 1s)
    pub retry_delay: Duration,
    /// Base URL prepended to every request URL
    pub base_url: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: "cms-gateway/1.0".to_string(),
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            base_url: None,
        }
    }
}

impl HttpConfig {
    /// Create a new HTTP config with custom timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a new HTTP config with custom connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Create a new HTTP config with custom user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Create a new HTTP config with custom pool settings.
    #[must_use]
    pub const fn with_pool_config(mut self, idle_timeout: Duration, max_idle: usize) -> Self {
        self.pool_idle_timeout = idle_timeout;
        self.pool_max_idle_per_host = max_idle;
        self
    }

    /// Create a new HTTP config with custom retry count.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Create a new HTTP config with custom backoff base.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Create a new HTTP config with a default base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Build a configured HTTP client.
///
/// The per-attempt timeout is applied on each request rather than on the
/// client, so calls can override it.
///
/// # Errors
///
/// Returns an error if the client cannot be built (e.g., TLS initialization fails).
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .build()
}

/// Per-call overrides. Unset fields fall back to [`HttpConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequestConfig {
    /// Extra request headers, applied over `Content-Type: application/json`
    pub headers: Vec<(String, String)>,
    /// Query parameters
    pub params: Vec<(String, String)>,
    /// Per-attempt timeout
    pub timeout: Option<Duration>,
    /// Retries after the first attempt
    pub retries: Option<u32>,
    /// Linear backoff base
    pub retry_delay: Option<Duration>,
    /// Base URL prepended to the request URL
    pub base_url: Option<String>,
}

impl HttpRequestConfig {
    /// Empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Override the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the retry count.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Override the backoff base delay.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Per-call settings after applying defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedConfig {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl HttpConfig {
    pub(crate) fn resolve(&self, url: &str, call: HttpRequestConfig) -> ResolvedConfig {
        let base = call.base_url.as_deref().or(self.base_url.as_deref());
        ResolvedConfig {
            url: resolve_url(base, url),
            headers: call.headers,
            params: call.params,
            timeout: call.timeout.unwrap_or(self.timeout),
            retry: RetryConfig {
                retries: call.retries.unwrap_or(self.retries),
                base_delay: call.retry_delay.unwrap_or(self.retry_delay),
            },
        }
    }
}

/// `base + url` when a base is set, otherwise `url` unchanged.
#[must_use]
pub fn resolve_url(base_url: Option<&str>, url: &str) -> String {
    match base_url {
        Some(base) => format!("{base}{url}"),
        None => url.to_string(),
    }
}
