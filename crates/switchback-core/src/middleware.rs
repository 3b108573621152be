//! Middleware chain execution.
//!
//! A request flows through an ordered chain of [`Middleware`] values
//! and ends at a [`Handler`]. Each middleware receives the context and
//! a [`Next`] continuation; it may call the continuation zero times
//! (short-circuit) or exactly one time. `Next` is consumed by
//! [`Next::run`], so the type system rules out calling it twice.
//!
//! Ordering is onion-shaped: the first middleware in the chain is the
//! first to see the request and the last to see the response.
//!
//! # Example
//!
//! ```ignore
//! let auth = middleware_fn(|ctx: RequestContext, next: Next| async move {
//!     if ctx.request().headers().get("authorization").is_none() {
//!         return Ok(Response::new(StatusCode::UNAUTHORIZED));
//!     }
//!     next.run(ctx).await
//! });
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::response::{IntoResponse, Response};

/// Boxed error type carried along the chain.
///
/// Anything that implements `std::error::Error` converts into it with
/// `?`; the dispatcher's single error boundary turns whatever comes
/// out into a response.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future, the object-safe return type for chain stages.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Terminal stage of the chain.
///
/// Implemented automatically for `async fn(RequestContext) ->
/// Result<Response, BoxError>` and closures of the same shape.
pub trait Handler: Send + Sync {
    /// Handle the request.
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, Result<Response, BoxError>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, Result<Response, BoxError>> {
        Box::pin((self)(ctx))
    }
}

/// Adapter running a closure's success value through
/// [`IntoResponse`].
///
/// Lets endpoints return any convertible shape (`&str`,
/// `serde_json::Value`, `(StatusCode, T)`, `Option<T>`, ...) instead
/// of assembling a [`Response`] by hand.
pub struct HandlerFn<F> {
    f: F,
}

impl<F, Fut, T> Handler for HandlerFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    T: IntoResponse,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, Result<Response, BoxError>> {
        let fut = (self.f)(ctx);
        Box::pin(async move { fut.await.map(IntoResponse::into_response) })
    }
}

/// Wrap a closure as a [`Handler`], converting whatever it returns
/// into a [`Response`].
pub fn handler_fn<F, Fut, T>(f: F) -> HandlerFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    T: IntoResponse,
{
    HandlerFn { f }
}

/// One layer of the onion.
pub trait Middleware: Send + Sync {
    /// Process the request, deciding whether to continue the chain.
    fn handle(
        &self,
        ctx: RequestContext,
        next: Next,
    ) -> BoxFuture<'static, Result<Response, BoxError>>;
}

/// Adapter turning a closure into a [`Middleware`].
pub struct MiddlewareFn<F> {
    f: F,
}

impl<F, Fut> Middleware for MiddlewareFn<F>
where
    F: Fn(RequestContext, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    fn handle(
        &self,
        ctx: RequestContext,
        next: Next,
    ) -> BoxFuture<'static, Result<Response, BoxError>> {
        Box::pin((self.f)(ctx, next))
    }
}

/// Wrap a closure as a [`Middleware`].
pub fn middleware_fn<F, Fut>(f: F) -> MiddlewareFn<F>
where
    F: Fn(RequestContext, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    MiddlewareFn { f }
}

/// The rest of the chain, viewed from inside one middleware.
///
/// Running it consumes it; not running it short-circuits the chain
/// and makes the middleware's own return value the response.
pub struct Next {
    entries: Arc<[Arc<dyn Middleware>]>,
    endpoint: Arc<dyn Handler>,
    index: usize,
}

impl Next {
    /// Assemble a chain over `entries` ending at `endpoint`.
    #[must_use]
    pub fn new(entries: Arc<[Arc<dyn Middleware>]>, endpoint: Arc<dyn Handler>) -> Self {
        Self {
            entries,
            endpoint,
            index: 0,
        }
    }

    /// Invoke the next stage.
    ///
    /// Each stage's future is boxed, so chain depth costs heap, not
    /// stack.
    pub async fn run(mut self, ctx: RequestContext) -> Result<Response, BoxError> {
        if self.index < self.entries.len() {
            let middleware = Arc::clone(&self.entries[self.index]);
            self.index += 1;
            middleware.handle(ctx, self).await
        } else {
            self.endpoint.call(ctx).await
        }
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &(self.entries.len() - self.index))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;
    use crate::request::Request;
    use crate::response::StatusCode;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    fn ctx() -> RequestContext {
        RequestContext::new(Request::new(Method::Get, "/"), HashMap::new())
    }

    async fn ok_handler(_ctx: RequestContext) -> Result<Response, BoxError> {
        Ok(Response::text("done"))
    }

    fn chain(entries: Vec<Arc<dyn Middleware>>) -> Next {
        Next::new(entries.into(), Arc::new(ok_handler))
    }

    #[tokio::test]
    async fn empty_chain_reaches_handler() {
        let response = chain(Vec::new()).run(ctx()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body_ref().as_bytes(), Some(b"done".as_slice()));
    }

    #[tokio::test]
    async fn onion_ordering() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let outer_log = Arc::clone(&log);
        let outer = middleware_fn(move |ctx, next: Next| {
            let log = Arc::clone(&outer_log);
            async move {
                log.lock().push("outer:before");
                let response = next.run(ctx).await;
                log.lock().push("outer:after");
                response
            }
        });

        let inner_log = Arc::clone(&log);
        let inner = middleware_fn(move |ctx, next: Next| {
            let log = Arc::clone(&inner_log);
            async move {
                log.lock().push("inner:before");
                let response = next.run(ctx).await;
                log.lock().push("inner:after");
                response
            }
        });

        let entries: Vec<Arc<dyn Middleware>> = vec![Arc::new(outer), Arc::new(inner)];
        chain(entries).run(ctx()).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec!["outer:before", "inner:before", "inner:after", "outer:after"]
        );
    }

    #[tokio::test]
    async fn short_circuit_skips_rest_of_chain() {
        let reached: Arc<Mutex<bool>> = Arc::new(Mutex::new(false));

        let gate = middleware_fn(|_ctx, _next: Next| async move {
            Ok(Response::new(StatusCode::FORBIDDEN))
        });

        let reached_flag = Arc::clone(&reached);
        let witness = middleware_fn(move |ctx, next: Next| {
            let reached = Arc::clone(&reached_flag);
            async move {
                *reached.lock() = true;
                next.run(ctx).await
            }
        });

        let entries: Vec<Arc<dyn Middleware>> = vec![Arc::new(gate), Arc::new(witness)];
        let response = chain(entries).run(ctx()).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!*reached.lock(), "later stages must not run");
    }

    #[tokio::test]
    async fn handler_fn_converts_plain_values() {
        async fn greet(_ctx: RequestContext) -> Result<&'static str, BoxError> {
            Ok("hello")
        }
        let next = Next::new(Vec::new().into(), Arc::new(handler_fn(greet)));
        let response = next.run(ctx()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body_ref().as_bytes(), Some(b"hello".as_slice()));
        assert_eq!(
            response.header_value("content-type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[tokio::test]
    async fn handler_fn_converts_status_tuples() {
        async fn made(_ctx: RequestContext) -> Result<(StatusCode, String), BoxError> {
            Ok((StatusCode::CREATED, String::from("made")))
        }
        let next = Next::new(Vec::new().into(), Arc::new(handler_fn(made)));
        let response = next.run(ctx()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.body_ref().as_bytes(), Some(b"made".as_slice()));
    }

    #[tokio::test]
    async fn middleware_error_propagates() {
        let failing = middleware_fn(|_ctx, _next: Next| async move {
            Err::<Response, BoxError>("boom".into())
        });

        let entries: Vec<Arc<dyn Middleware>> = vec![Arc::new(failing)];
        let err = chain(entries).run(ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn middleware_can_rewrite_response() {
        let stamp = middleware_fn(|ctx, next: Next| async move {
            let response = next.run(ctx).await?;
            Ok(response.header("x-stamped", "yes"))
        });

        let entries: Vec<Arc<dyn Middleware>> = vec![Arc::new(stamp)];
        let response = chain(entries).run(ctx()).await.unwrap();
        assert_eq!(response.header_value("x-stamped"), Some("yes"));
    }

    #[tokio::test]
    async fn state_written_before_is_visible_after() {
        let write = middleware_fn(|ctx: RequestContext, next: Next| async move {
            ctx.state().insert(String::from("trace-1"));
            next.run(ctx).await
        });

        async fn read_handler(ctx: RequestContext) -> Result<Response, BoxError> {
            let trace = ctx.state().get::<String>().unwrap_or_default();
            Ok(Response::text(trace))
        }

        let entries: Vec<Arc<dyn Middleware>> = vec![Arc::new(write)];
        let next = Next::new(entries.into(), Arc::new(read_handler));
        let response = next.run(ctx()).await.unwrap();
        assert_eq!(response.body_ref().as_bytes(), Some(b"trace-1".as_slice()));
    }
}
