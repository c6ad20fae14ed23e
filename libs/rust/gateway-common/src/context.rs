//! Request-scoped correlation context.
//!
//! A [`RequestContext`] is installed for the dynamic extent of a future with
//! [`run`]. Any code polled inside that future (nested calls, timers, awaited
//! I/O) can read it back through [`get`], [`request_id`] or [`start_time`]
//! without threading it through every signature.
//!
//! The slot is task-local: a task spawned with `tokio::spawn` does not
//! inherit it. Use [`spawn_with_context`] or [`run_blocking`] to hand the
//! context across an execution-unit boundary explicitly.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

tokio::task_local! {
    static CURRENT: RequestContext;
}

/// Correlation data for one logical inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: String,
    start_time: DateTime<Utc>,
    started: Instant,
}

impl RequestContext {
    /// Create a context for `request_id`, starting now.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            start_time: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Create a context with a freshly generated UUID v4 request id.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// The correlation id.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wall-clock time the request entered the service.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Time elapsed since the request entered the service.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Run `future` with `context` as the ambient request context.
///
/// The context is visible to everything polled inside `future` and is gone
/// once it completes.
pub async fn run<F>(context: RequestContext, future: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(context, future).await
}

/// Run a synchronous closure with `context` as the ambient request context.
pub fn run_blocking<R>(context: RequestContext, f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(context, f)
}

/// The ambient context, or `None` outside any [`run`] scope.
#[must_use]
pub fn get() -> Option<RequestContext> {
    CURRENT.try_with(Clone::clone).ok()
}

/// The ambient request id, or `None` outside any [`run`] scope.
#[must_use]
pub fn request_id() -> Option<String> {
    CURRENT.try_with(|ctx| ctx.request_id.clone()).ok()
}

/// The ambient request start time, or `None` outside any [`run`] scope.
#[must_use]
pub fn start_time() -> Option<DateTime<Utc>> {
    CURRENT.try_with(|ctx| ctx.start_time).ok()
}

/// Spawn a tokio task that inherits the current context, if any.
pub fn spawn_with_context<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match get() {
        Some(context) => tokio::spawn(CURRENT.scope(context, future)),
        None => tokio::spawn(future),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_context_outside_scope() {
        assert!(get().is_none());
        assert!(request_id().is_none());
        assert!(start_time().is_none());
    }

    #[tokio::test]
    async fn test_context_visible_inside_scope() {
        let ctx = RequestContext::new("req-1");
        let seen = run(ctx.clone(), async { request_id() }).await;
        assert_eq!(seen.as_deref(), Some("req-1"));
        assert!(request_id().is_none());
    }

    #[tokio::test]
    async fn test_context_survives_await_points() {
        let seen = run(RequestContext::new("req-sleep"), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            tokio::task::yield_now().await;
            request_id()
        })
        .await;
        assert_eq!(seen.as_deref(), Some("req-sleep"));
    }

    #[tokio::test]
    async fn test_run_returns_future_output() {
        let out = run(RequestContext::generate(), async { 40 + 2 }).await;
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn test_nested_scope_restores_outer() {
        let (inner, outer) = run(RequestContext::new("outer"), async {
            let inner = run(RequestContext::new("inner"), async { request_id() }).await;
            (inner, request_id())
        })
        .await;
        assert_eq!(inner.as_deref(), Some("inner"));
        assert_eq!(outer.as_deref(), Some("outer"));
    }

    #[tokio::test]
    async fn test_concurrent_scopes_are_isolated() {
        let a = run(RequestContext::new("req-A"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            request_id()
        });
        let b = run(RequestContext::new("req-B"), async {
            tokio::task::yield_now().await;
            request_id()
        });
        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.as_deref(), Some("req-A"));
        assert_eq!(b.as_deref(), Some("req-B"));
    }

    #[tokio::test]
    async fn test_plain_spawn_does_not_inherit() {
        let handle = run(RequestContext::new("req-spawn"), async {
            tokio::spawn(async { request_id() })
        })
        .await;
        assert!(handle.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_spawn_with_context_hands_off() {
        let handle = run(RequestContext::new("req-handoff"), async {
            spawn_with_context(async { request_id() })
        })
        .await;
        assert_eq!(handle.await.unwrap().as_deref(), Some("req-handoff"));
    }

    #[test]
    fn test_run_blocking_scope() {
        let seen = run_blocking(RequestContext::new("req-sync"), request_id);
        assert_eq!(seen.as_deref(), Some("req-sync"));
        assert!(request_id().is_none());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = RequestContext::generate();
        let b = RequestContext::generate();
        assert_ne!(a.request_id(), b.request_id());
        assert_eq!(a.request_id().len(), 36);
    }
}
