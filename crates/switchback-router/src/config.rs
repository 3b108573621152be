//! Dispatcher configuration.

use std::fmt;
use std::sync::Arc;

use switchback_core::{BoxError, Request, RequestContext, Response};

use crate::pattern::normalize_prefix;

/// Producer for 404 responses. Receives the request so the body can
/// echo the method and path.
pub type NotFoundHandler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// Producer for 500 responses when a handler or middleware errors.
pub type ErrorHandler = Arc<dyn Fn(&BoxError, &RequestContext) -> Response + Send + Sync>;

/// Settings applied when building a [`Dispatcher`](crate::Dispatcher).
///
/// The base path is stripped from incoming request paths before
/// lookup. It defaults to `/api`; configure an empty string to route
/// on full paths.
pub struct DispatcherConfig {
    base_path: String,
    not_found: Option<NotFoundHandler>,
    error_handler: Option<ErrorHandler>,
    debug: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            base_path: String::from("/api"),
            not_found: None,
            error_handler: None,
            debug: false,
        }
    }
}

impl DispatcherConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base path. Normalized to a leading slash and no
    /// trailing slash; `""` and `"/"` both disable stripping.
    #[must_use]
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = normalize_prefix(&base_path.into());
        self
    }

    /// Replace the built-in 404 response.
    #[must_use]
    pub fn not_found<F>(mut self, producer: F) -> Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.not_found = Some(Arc::new(producer));
        self
    }

    /// Replace the built-in 500 response. The original error is
    /// passed alongside the request context that produced it.
    #[must_use]
    pub fn error_handler<F>(mut self, producer: F) -> Self
    where
        F: Fn(&BoxError, &RequestContext) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(producer));
        self
    }

    /// Emit a `tracing` event for every dispatch outcome.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub(crate) fn base_path_str(&self) -> &str {
        &self.base_path
    }

    pub(crate) fn not_found_handler(&self) -> Option<&NotFoundHandler> {
        self.not_found.as_ref()
    }

    pub(crate) fn error_handler_fn(&self) -> Option<&ErrorHandler> {
        self.error_handler.as_ref()
    }

    pub(crate) fn debug_enabled(&self) -> bool {
        self.debug
    }
}

impl fmt::Debug for DispatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherConfig")
            .field("base_path", &self.base_path)
            .field("not_found", &self.not_found.as_ref().map(|_| "<fn>"))
            .field("error_handler", &self.error_handler.as_ref().map(|_| "<fn>"))
            .field("debug", &self.debug)
            .finish()
    }
}
