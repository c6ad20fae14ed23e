//! Resilient HTTP client.
//!
//! Every verb runs the same attempt loop: resolve the URL, merge headers
//! (adding `x-request-id` from the ambient context), then try up to
//! `retries + 1` times. Network failures, 5xx and 429 are retried after a
//! linear backoff; anything else ends the call. Each stage is logged.

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::config::{HttpConfig, HttpRequestConfig};
use super::response::{HttpResponse, normalize_headers};
use super::transport::{HttpTransport, RawResponse, ReqwestTransport, TransportError, TransportRequest};
use crate::context;
use crate::error::{BoxError, FailureKind, HttpClientError};
use crate::logging::{Logger, LoggerPort};
use crate::retry::{AttemptFailure, RetryPolicy};

/// Header carrying the correlation id on outbound calls.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Context label used for the client's log records.
pub const LOG_CONTEXT: &str = "HttpClient";

/// Outbound HTTP port used by application code.
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    /// `GET url`.
    async fn get<T>(
        &self,
        url: &str,
        config: Option<HttpRequestConfig>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned + Send;

    /// `POST url` with an optional JSON body.
    async fn post<T, B>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<HttpRequestConfig>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized;

    /// `PUT url` with an optional JSON body.
    async fn put<T, B>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<HttpRequestConfig>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized;

    /// `PATCH url` with an optional JSON body.
    async fn patch<T, B>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<HttpRequestConfig>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized;

    /// `DELETE url`.
    async fn delete<T>(
        &self,
        url: &str,
        config: Option<HttpRequestConfig>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned + Send;
}

/// HTTP client with retries, correlation-id propagation and logging.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn HttpTransport>,
    logger: Arc<dyn LoggerPort>,
    config: HttpConfig,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Client over a pooled `reqwest` transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be built.
    pub fn new(config: HttpConfig) -> Result<Self, HttpClientError> {
        let transport = ReqwestTransport::new(&config)
            .map_err(|e| HttpClientError::new("Failed to build HTTP transport").with_cause(e))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Client over a custom transport. Logging is off until
    /// [`with_logger`](Self::with_logger) is called.
    #[must_use]
    pub fn with_transport(config: HttpConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            logger: Arc::new(Logger::noop()),
            config,
        }
    }

    /// Log through `logger`, labelled `HttpClient`.
    #[must_use]
    pub fn with_logger(mut self, logger: &dyn LoggerPort) -> Self {
        self.logger = logger.set_context(LOG_CONTEXT);
        self
    }

    /// Client-wide defaults.
    #[must_use]
    pub const fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Run the attempt loop for one call.
    ///
    /// # Errors
    ///
    /// Returns the final failure once retries are exhausted or a terminal
    /// failure occurs.
    pub async fn request<T>(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        config: HttpRequestConfig,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned,
    {
        let resolved = self.config.resolve(url, config);
        let headers = build_headers(&resolved.headers, context::request_id());
        let policy = RetryPolicy::new(resolved.retry);
        let target = format!("{method} {}", resolved.url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            if attempt > 1 {
                let retry = attempt - 1;
                self.logger.debug(
                    &format!("Retry attempt {retry}/{} for {target}", policy.retries()),
                    None,
                    Some(json!({ "url": resolved.url, "attempt": attempt })),
                );
                tokio::time::sleep(policy.delay_for_retry(retry)).await;
            }

            self.logger.debug(
                &format!("HTTP {target} (attempt {attempt})"),
                None,
                Some(json!({ "url": resolved.url, "attempt": attempt })),
            );

            let request = TransportRequest {
                method: method.clone(),
                url: resolved.url.clone(),
                headers: headers.clone(),
                params: resolved.params.clone(),
                body: body.clone(),
                timeout: resolved.timeout,
            };

            let (failure, cause) = match self.transport.send(request).await {
                Ok(raw) if (200..300).contains(&raw.status) => {
                    self.logger.debug(
                        &format!("HTTP {target} responded {}", raw.status),
                        None,
                        Some(json!({ "status": raw.status, "attempt": attempt })),
                    );
                    match into_response(raw) {
                        Ok(response) => return Ok(response),
                        Err(err) => (
                            AttemptFailure::Other {
                                message: format!("Failed to decode response body: {err}"),
                            },
                            Some(Box::new(err) as BoxError),
                        ),
                    }
                }
                Ok(raw) => (
                    AttemptFailure::Transport {
                        status: Some(raw.status),
                        body: error_body(&raw.body),
                        message: format!("Request failed with status code {}", raw.status),
                    },
                    None,
                ),
                Err(TransportError::Other(message)) => (
                    AttemptFailure::Other {
                        message: message.clone(),
                    },
                    Some(Box::new(TransportError::Other(message)) as BoxError),
                ),
                Err(err) => (
                    AttemptFailure::Transport {
                        status: None,
                        body: None,
                        message: err.to_string(),
                    },
                    Some(Box::new(err) as BoxError),
                ),
            };

            self.logger.warn(
                &format!("HTTP {target} attempt {attempt} failed: {}", failure.message()),
                None,
                Some(json!({
                    "status": failure.status(),
                    "message": failure.message(),
                    "attempt": attempt,
                })),
            );

            if !policy.should_retry(&failure, attempt) {
                self.logger.error(
                    &format!(
                        "HTTP {target} failed after {attempt} attempts: {}",
                        failure.message()
                    ),
                    None,
                    Some(json!({
                        "status": failure.status(),
                        "message": failure.message(),
                        "attempts": attempt,
                    })),
                );
                return Err(into_client_error(failure, cause));
            }
        }
    }

    async fn with_body<T, B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        config: Option<HttpRequestConfig>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = match body.map(serde_json::to_value).transpose() {
            Ok(body) => body,
            Err(err) => {
                self.logger.error(
                    &format!("HTTP {method} {url} failed: request body is not serializable"),
                    None,
                    Some(json!({ "message": err.to_string() })),
                );
                return Err(HttpClientError::new("Failed to serialize request body").with_cause(err));
            }
        };
        self.request(method, url, body, config.unwrap_or_default())
            .await
    }
}

#[async_trait]
impl HttpClientPort for HttpClient {
    async fn get<T>(
        &self,
        url: &str,
        config: Option<HttpRequestConfig>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned + Send,
    {
        self.request(Method::GET, url, None, config.unwrap_or_default())
            .await
    }

    async fn post<T, B>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<HttpRequestConfig>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized,
    {
        self.with_body(Method::POST, url, body, config).await
    }

    async fn put<T, B>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<HttpRequestConfig>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized,
    {
        self.with_body(Method::PUT, url, body, config).await
    }

    async fn patch<T, B>(
        &self,
        url: &str,
        body: Option<&B>,
        config: Option<HttpRequestConfig>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned + Send,
        B: Serialize + Sync + ?Sized,
    {
        self.with_body(Method::PATCH, url, body, config).await
    }

    async fn delete<T>(
        &self,
        url: &str,
        config: Option<HttpRequestConfig>,
    ) -> Result<HttpResponse<T>, HttpClientError>
    where
        T: DeserializeOwned + Send,
    {
        self.request(Method::DELETE, url, None, config.unwrap_or_default())
            .await
    }
}

/// `Content-Type: application/json`, overlaid with the caller's headers
/// (case-insensitive replace), then `x-request-id` when a correlation id is
/// in scope.
fn build_headers(overrides: &[(String, String)], request_id: Option<String>) -> Vec<(String, String)> {
    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    for (name, value) in overrides {
        set_header(&mut headers, name, value.clone());
    }
    if let Some(request_id) = request_id {
        set_header(&mut headers, REQUEST_ID_HEADER, request_id);
    }
    headers
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
        Some(slot) => slot.1 = value,
        None => headers.push((name.to_string(), value)),
    }
}

fn into_response<T: DeserializeOwned>(raw: RawResponse) -> Result<HttpResponse<T>, serde_json::Error> {
    Ok(HttpResponse {
        data: decode(&raw.body)?,
        status: raw.status,
        status_text: raw.status_text,
        headers: normalize_headers(&raw.headers),
    })
}

/// JSON body into `T`. An empty body decodes as `null`; a non-JSON body is
/// offered to `T` as a plain string.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, serde_json::Error> {
    if body.is_empty() {
        return serde_json::from_value(Value::Null);
    }
    serde_json::from_slice(body).or_else(|err| {
        serde_json::from_value(Value::String(String::from_utf8_lossy(body).into_owned()))
            .map_err(|_| err)
    })
}

/// Error body as JSON, falling back to text; `None` when empty.
fn error_body(body: &[u8]) -> Option<Value> {
    if body.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned())),
    )
}

fn into_client_error(failure: AttemptFailure, cause: Option<BoxError>) -> HttpClientError {
    let (kind, message, status, data) = match failure {
        AttemptFailure::Transport {
            status: None,
            message,
            ..
        } => (FailureKind::Network, message, None, None),
        AttemptFailure::Transport {
            status,
            body,
            message,
        } => (FailureKind::Response, message, status, body),
        AttemptFailure::Other { message } => (FailureKind::Other, message, None, None),
    };
    HttpClientError {
        message,
        kind,
        status,
        data,
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::logging::{LogLevel, MemorySink};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    type Outcome = Result<RawResponse, TransportError>;

    #[derive(Default)]
    struct Scripted {
        outcomes: Mutex<VecDeque<Outcome>>,
        seen: Mutex<Vec<TransportRequest>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Outcome>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                seen: Mutex::default(),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().len()
        }
    }

    #[async_trait]
    impl HttpTransport for Scripted {
        async fn send(&self, request: TransportRequest) -> Outcome {
            self.seen.lock().push(request);
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::network("script exhausted")))
        }
    }

    fn client(transport: Arc<Scripted>) -> (HttpClient, MemorySink) {
        let sink = MemorySink::new();
        let logger = Logger::builder()
            .min_level(LogLevel::Verbose)
            .sink(sink.clone())
            .build();
        let config = HttpConfig::default().with_retry_delay(Duration::from_millis(1));
        let client = HttpClient::with_transport(config, transport).with_logger(&logger);
        (client, sink)
    }

    #[test]
    fn test_build_headers_defaults() {
        let headers = build_headers(&[], None);
        assert_eq!(
            headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn test_build_headers_overlay_and_request_id() {
        let overrides = vec![
            ("content-type".to_string(), "text/plain".to_string()),
            ("Authorization".to_string(), "Bearer abc".to_string()),
        ];
        let headers = build_headers(&overrides, Some("req-9".to_string()));
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[0].1, "text/plain");
        assert!(headers.contains(&("Authorization".to_string(), "Bearer abc".to_string())));
        assert!(headers.contains(&("x-request-id".to_string(), "req-9".to_string())));
    }

    #[test]
    fn test_decode_variants() {
        let value: Value = decode(br#"{"a":1}"#).unwrap();
        assert_eq!(value["a"], 1);
        let empty: Option<Value> = decode(b"").unwrap();
        assert!(empty.is_none());
        let text: String = decode(b"plain text").unwrap();
        assert_eq!(text, "plain text");
        assert!(decode::<u32>(b"not a number").is_err());
    }

    #[test]
    fn test_error_body() {
        assert_eq!(error_body(b""), None);
        assert_eq!(error_body(br#"{"e":1}"#), Some(json!({"e": 1})));
        assert_eq!(error_body(b"oops"), Some(json!("oops")));
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let transport = Scripted::new(vec![Ok(RawResponse::json(200, &json!({"id": 1})))]);
        let (client, sink) = client(transport.clone());

        let response: HttpResponse<Value> = client.get("http://cms/api/x", None).await.unwrap();
        assert_eq!(response.data["id"], 1);
        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, "OK");
        assert_eq!(transport.calls(), 1);
        assert!(sink.at_level(LogLevel::Warn).is_empty());
        assert!(sink.records().iter().all(|r| r.context.as_deref() == Some(LOG_CONTEXT)));
    }

    #[tokio::test]
    async fn test_request_id_header_from_context() {
        let transport = Scripted::new(vec![Ok(RawResponse::json(200, &json!(null)))]);
        let (client, _sink) = client(transport.clone());

        let _: HttpResponse<Value> = context::run(RequestContext::new("req-ctx"), async {
            client.get("http://cms/api/x", None).await
        })
        .await
        .unwrap();

        let seen = transport.seen.lock();
        assert_eq!(seen[0].header(REQUEST_ID_HEADER), Some("req-ctx"));
    }

    #[tokio::test]
    async fn test_no_request_id_header_without_context() {
        let transport = Scripted::new(vec![Ok(RawResponse::json(200, &json!(null)))]);
        let (client, _sink) = client(transport.clone());
        let _: HttpResponse<Value> = client.get("http://cms/api/x", None).await.unwrap();
        assert_eq!(transport.seen.lock()[0].header(REQUEST_ID_HEADER), None);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let transport = Scripted::new(vec![Ok(RawResponse::json(404, &json!({"error": "nope"})))]);
        let (client, sink) = client(transport.clone());

        let err = client.get::<Value>("http://cms/missing", None).await.unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.data, Some(json!({"error": "nope"})));
        assert_eq!(transport.calls(), 1);
        assert_eq!(sink.at_level(LogLevel::Warn).len(), 1);
        assert_eq!(sink.at_level(LogLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_retried() {
        let transport = Scripted::new(vec![
            Ok(RawResponse::json(429, &json!({}))),
            Ok(RawResponse::json(200, &json!("ok"))),
        ]);
        let (client, _sink) = client(transport.clone());
        let response: HttpResponse<String> = client.get("http://cms/x", None).await.unwrap();
        assert_eq!(response.data, "ok");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_network_failures_exhaust_retries() {
        let transport = Scripted::new(vec![]);
        let (client, sink) = client(transport.clone());

        let err = client
            .get::<Value>("http://cms/x", Some(HttpRequestConfig::new().with_retries(2)))
            .await
            .unwrap_err();
        assert!(err.is_network_error());
        assert!(err.is_retryable());
        assert!(err.cause.is_some());
        assert_eq!(transport.calls(), 3);
        assert_eq!(sink.at_level(LogLevel::Warn).len(), 3);
        let error = &sink.at_level(LogLevel::Error)[0];
        assert!(error.message.contains("failed after 3 attempts"));
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let transport = Scripted::new(vec![Ok(RawResponse::json(500, &json!({})))]);
        let (client, _sink) = client(transport.clone());
        let err = client
            .get::<Value>("http://cms/x", Some(HttpRequestConfig::new().with_retries(0)))
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(500));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_post_sends_body_and_params() {
        let transport = Scripted::new(vec![Ok(RawResponse::json(201, &json!({"id": 7})))]);
        let (client, _sink) = client(transport.clone());

        let config = HttpRequestConfig::new()
            .with_base_url("http://cms")
            .with_param("populate", "*");
        let response: HttpResponse<Value> = client
            .post("/api/articles", Some(&json!({"title": "t"})), Some(config))
            .await
            .unwrap();
        assert_eq!(response.status, 201);

        let seen = transport.seen.lock();
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].url, "http://cms/api/articles");
        assert_eq!(seen[0].body, Some(json!({"title": "t"})));
        assert_eq!(seen[0].params, vec![("populate".to_string(), "*".to_string())]);
        assert_eq!(seen[0].timeout, Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn test_put_patch_delete_methods() {
        let transport = Scripted::new(vec![
            Ok(RawResponse::json(200, &json!(null))),
            Ok(RawResponse::json(200, &json!(null))),
            Ok(RawResponse::json(204, &json!(null))),
        ]);
        let (client, _sink) = client(transport.clone());

        let _: HttpResponse<Value> = client.put("http://x/1", Some(&json!({})), None).await.unwrap();
        let _: HttpResponse<Value> = client.patch("http://x/1", None::<&Value>, None).await.unwrap();
        let _: HttpResponse<Value> = client.delete("http://x/1", None).await.unwrap();

        let methods: Vec<Method> = transport.seen.lock().iter().map(|r| r.method.clone()).collect();
        assert_eq!(methods, vec![Method::PUT, Method::PATCH, Method::DELETE]);
    }

    #[tokio::test]
    async fn test_decode_failure_is_terminal() {
        let transport = Scripted::new(vec![Ok(RawResponse::json(200, &json!({"not": "a number"})))]);
        let (client, _sink) = client(transport.clone());
        let err = client.get::<u64>("http://x", None).await.unwrap_err();
        assert!(err.status.is_none());
        assert!(err.message.starts_with("Failed to decode"));
        assert_eq!(transport.calls(), 1);
        assert_eq!(err.kind, FailureKind::Other);
        assert!(!err.is_network_error());
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_rejected_request_is_terminal() {
        let transport = Scripted::new(vec![Err(TransportError::Other("invalid URL".to_string()))]);
        let (client, _sink) = client(transport.clone());
        let err = client.get::<Value>("not a url", None).await.unwrap_err();
        assert_eq!(transport.calls(), 1);
        assert_eq!(err.kind, FailureKind::Other);
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_error_classification_matches_retry_decision() {
        let transport = Scripted::new(vec![
            Ok(RawResponse::json(503, &json!({}))),
            Ok(RawResponse::json(401, &json!({}))),
        ]);
        let (client, _sink) = client(transport.clone());
        let config = || Some(HttpRequestConfig::new().with_retries(0));

        let unavailable = client.get::<Value>("http://x", config()).await.unwrap_err();
        assert_eq!(unavailable.kind, FailureKind::Response);
        assert!(unavailable.is_retryable());

        let unauthorized = client.get::<Value>("http://x", config()).await.unwrap_err();
        assert!(unauthorized.is_client_error());
        assert!(!unauthorized.is_retryable());
    }
}
