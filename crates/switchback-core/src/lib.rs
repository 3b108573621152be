//! Core types for the switchback routing engine.
//!
//! This crate provides the request-side building blocks:
//! - [`Request`] and [`Response`] envelope types
//! - [`RequestContext`] handed to middleware and handlers
//! - [`Middleware`] / [`Handler`] traits and the [`Next`] continuation
//! - Streaming response writers with abort-aware teardown
//!
//! # Design Principles
//!
//! - The engine owns no sockets; host adapters feed it envelopes
//! - Route data is immutable once built, so lookups need no locking
//! - Each request's context is independent; clones share interior state
//! - All types are `Send + Sync`

#![forbid(unsafe_code)]

mod abort;
mod context;
mod method;
pub mod middleware;
mod query;
mod request;
mod response;
pub mod streaming;

pub use abort::{AbortHandle, AbortSignal, abort_channel};
pub use context::{RequestContext, StateMap};
pub use method::{Method, MethodParseError};
pub use middleware::{
    BoxError, BoxFuture, Handler, HandlerFn, Middleware, MiddlewareFn, Next, handler_fn,
    middleware_fn,
};
pub use query::{QueryMap, percent_decode_form, percent_decode_path};
pub use request::{Body, Headers, Request};
pub use response::{IntoResponse, Response, ResponseBody, StatusCode};
pub use streaming::{
    BodyStream, JsonStreamMode, JsonStreamWriter, StreamWriter, json_stream_response,
    stream_response,
};
