//! Trie-based HTTP request-routing engine.
//!
//! switchback resolves incoming requests against declared route
//! patterns and runs the winner's middleware chain and handler. It
//! owns no sockets: a host embeds the engine, hands it one
//! [`Request`] envelope per incoming call, and writes out whatever
//! [`Response`] comes back.
//!
//! - **Expressive patterns** — literals, `:param`, `:param(regex)`,
//!   `*` wildcards, and `**` catch-alls
//! - **Predictable resolution** — ordered backtracking, most-specific
//!   candidate first, with exact 405 `allow` sets
//! - **Layered middleware** — global, group, and per-route chains
//!   with a consume-once [`Next`] continuation
//! - **Streaming responses** — channel-backed bodies with abort-aware
//!   teardown, plain or JSON-framed
//!
//! # Quick Start
//!
//! ```ignore
//! use switchback::prelude::*;
//!
//! async fn show_user(ctx: RequestContext) -> Result<Response, BoxError> {
//!     let id = ctx.param("id").unwrap_or("unknown");
//!     Ok(Response::text(format!("user {id}")))
//! }
//!
//! let dispatcher = Dispatcher::builder()
//!     .route(Route::get("/users/:id", show_user)?)
//!     .build();
//!
//! // In the host's request loop:
//! let response = dispatcher.dispatch(request).await;
//! ```
//!
//! # Crate Structure
//!
//! - [`switchback_core`] — request/response envelopes, context,
//!   middleware traits, streaming writers
//! - [`switchback_router`] — pattern grammar, the route trie, and the
//!   dispatch pipeline

#![forbid(unsafe_code)]

// Re-export crates
pub use switchback_core as core;
pub use switchback_router as router;

// Route metadata values are `serde_json::Value`; hosts build them
// through this re-export without depending on serde_json themselves.
pub use serde_json;

// Re-export commonly used types
pub use switchback_core::{
    AbortHandle, AbortSignal, Body, BoxError, BoxFuture, Handler, HandlerFn, Headers,
    IntoResponse, Method, MethodParseError, Middleware, MiddlewareFn, Next, QueryMap, Request,
    RequestContext, Response, ResponseBody, StateMap, StatusCode, abort_channel, handler_fn,
    middleware_fn,
};
pub use switchback_core::{
    BodyStream, JsonStreamMode, JsonStreamWriter, StreamWriter, json_stream_response,
    stream_response,
};
pub use switchback_router::{
    AllowedMethods, Declaration, Dispatcher, DispatcherBuilder, DispatcherConfig, PatternError,
    Registry, Route, RouteGroup, RouteLookup, RouteMatch, RouteTrie,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        BoxError, Dispatcher, DispatcherConfig, IntoResponse, Method, Middleware, Next, Request,
        RequestContext, Response, Route, RouteGroup, StatusCode, handler_fn,
        json_stream_response, middleware_fn, stream_response,
    };
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::json;
}
