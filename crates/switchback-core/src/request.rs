//! HTTP request envelope.
//!
//! [`Request`] is what a host adapter hands to the dispatcher: method,
//! target, headers, body, any parameters the host already extracted
//! (for example from the `Host` header), and the abort pair for the
//! connection. The engine never reads sockets itself.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::abort::{AbortHandle, AbortSignal, abort_channel};
use crate::method::Method;

/// HTTP headers collection (case-insensitive names).
#[derive(Debug, Default)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    /// Create empty headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Insert a header, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Whether a header is present (case-insensitive).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterate over all headers as (name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Request body.
#[derive(Debug)]
pub enum Body {
    /// No body.
    Empty,
    /// Fully buffered body.
    Bytes(Vec<u8>),
}

impl Body {
    /// Get body as bytes, consuming it.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            Self::Bytes(b) => b,
        }
    }

    /// Check if body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty) || matches!(self, Self::Bytes(b) if b.is_empty())
    }
}

/// One inbound HTTP request.
///
/// The target passed to [`Request::new`] is split at the first `?`;
/// everything after it is kept verbatim as the raw query string and
/// only decoded when the dispatcher builds the context.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    raw_query: Option<String>,
    headers: Headers,
    // Interior mutability so the body can be consumed through the
    // shared context without cloning the envelope.
    body: Mutex<Body>,
    host_params: HashMap<String, String>,
    abort_handle: AbortHandle,
    abort_signal: AbortSignal,
}

impl Request {
    /// Create a request from a method and a target (`/path?query`).
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        let target = target.into();
        let (path, raw_query) = match target.find('?') {
            Some(pos) => (target[..pos].to_string(), Some(target[pos + 1..].to_string())),
            None => (target, None),
        };
        let (abort_handle, abort_signal) = abort_channel();
        Self {
            method,
            path,
            raw_query,
            headers: Headers::new(),
            body: Mutex::new(Body::Empty),
            host_params: HashMap::new(),
            abort_handle,
            abort_signal,
        }
    }

    /// Get the HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get the request path (no query string).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the raw query string, if the target had one.
    #[must_use]
    pub fn raw_query(&self) -> Option<&str> {
        self.raw_query.as_deref()
    }

    /// Get the headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get mutable headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Set the body.
    pub fn set_body(&mut self, body: Body) {
        *self.body.lock() = body;
    }

    /// Take the body, leaving `Empty` behind.
    ///
    /// The body is consumed at most once per request; a second call
    /// yields `Body::Empty`.
    pub fn take_body(&self) -> Body {
        std::mem::replace(&mut *self.body.lock(), Body::Empty)
    }

    /// Add a parameter the host extracted outside the path (for
    /// example a subdomain captured from the `Host` header).
    ///
    /// Path parameters captured during matching take precedence over
    /// host parameters with the same name.
    pub fn insert_host_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.host_params.insert(name.into(), value.into());
    }

    /// Parameters provided by the host adapter.
    #[must_use]
    pub fn host_params(&self) -> &HashMap<String, String> {
        &self.host_params
    }

    /// The abort handle for this request; firing it tears down any
    /// streaming response still being produced.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// The abort signal observers race against.
    #[must_use]
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort_signal.clone()
    }
}
