//! Request-id middleware for inbound HTTP services.
//!
//! [`RequestIdLayer`] opens a correlation scope for every inbound request.
//! The id comes from the `x-request-id` header when the caller sent a usable
//! one, otherwise a fresh UUID v4 is generated. The id is echoed on the
//! response, and everything the handler does (logging, outbound calls) sees
//! it through [`crate::context`].

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::future::BoxFuture;
use http::{HeaderValue, Request, Response};
use serde_json::json;
use tower::{Layer, Service};
use tracing::{Instrument, info_span};

use crate::context::{self, RequestContext};
use crate::http::REQUEST_ID_HEADER;
use crate::logging::LoggerPort;

/// Longest inbound id accepted as-is.
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Layer that wraps services in [`RequestIdService`].
#[derive(Clone, Default)]
pub struct RequestIdLayer {
    logger: Option<Arc<dyn LoggerPort>>,
}

impl std::fmt::Debug for RequestIdLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestIdLayer")
            .field("logs_requests", &self.logger.is_some())
            .finish()
    }
}

impl RequestIdLayer {
    /// Layer without request logging.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an `http` record for every completed request.
    #[must_use]
    pub fn with_logger(mut self, logger: &dyn LoggerPort) -> Self {
        self.logger = Some(logger.set_context("HTTP"));
        self
    }
}

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService {
            inner,
            logger: self.logger.clone(),
        }
    }
}

/// Service that runs each request inside its own correlation scope.
#[derive(Clone)]
pub struct RequestIdService<S> {
    inner: S,
    logger: Option<Arc<dyn LoggerPort>>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestIdService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let request_id = incoming_request_id(&req).unwrap_or_else(|| {
            RequestContext::generate().request_id().to_string()
        });
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            req.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let logger = self.logger.clone();

        // Drive the clone that was polled ready.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let span = info_span!("request", request_id = %request_id, method = %method, path = %path);
        let scope = RequestContext::new(request_id.clone());

        Box::pin(
            context::run(scope, async move {
                let started = Instant::now();
                let mut response = inner.call(req).await?;

                if let Ok(value) = HeaderValue::from_str(&request_id) {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }

                if let Some(logger) = logger {
                    let status = response.status().as_u16();
                    logger.http(
                        &format!("{method} {path} {status}"),
                        None,
                        Some(json!({
                            "method": method,
                            "path": path,
                            "status": status,
                            "durationMs": u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        })),
                    );
                }

                Ok::<_, S::Error>(response)
            })
            .instrument(span),
        )
    }
}

/// The caller's `x-request-id`, when it is printable and of sane length.
fn incoming_request_id<B>(req: &Request<B>) -> Option<String> {
    let value = req.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    (!value.is_empty() && value.len() <= MAX_REQUEST_ID_LEN).then(|| value.to_string())
}
