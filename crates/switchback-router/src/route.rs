//! Route and route-group declarations.
//!
//! A [`Route`] binds a method and a path pattern to a handler, plus
//! any route-scoped middleware and free-form metadata. Pattern
//! validation happens in the constructor, so an invalid pattern never
//! reaches the trie.
//!
//! # Example
//!
//! ```ignore
//! let route = Route::get("/users/:id(\\d+)", find_user)?
//!     .middleware(require_auth)
//!     .with_metadata("tag", serde_json::json!("users"));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use switchback_core::{Handler, Method, Middleware};

use crate::pattern::{PatternError, Segment, normalize_prefix, parse_pattern};

/// One route declaration.
#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: String,
    segments: Arc<[Segment]>,
    handler: Arc<dyn Handler>,
    middleware: Vec<Arc<dyn Middleware>>,
    metadata: HashMap<String, serde_json::Value>,
    group: Option<String>,
}

impl Route {
    /// Create a route, validating the pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if the pattern violates the grammar
    /// (see [`parse_pattern`]).
    pub fn new<H>(
        method: Method,
        pattern: impl Into<String>,
        handler: H,
    ) -> Result<Self, PatternError>
    where
        H: Handler + 'static,
    {
        let pattern = pattern.into();
        let segments: Arc<[Segment]> = parse_pattern(&pattern)?.into();
        Ok(Self {
            method,
            pattern,
            segments,
            handler: Arc::new(handler),
            middleware: Vec::new(),
            metadata: HashMap::new(),
            group: None,
        })
    }

    /// A `GET` route.
    pub fn get<H: Handler + 'static>(
        pattern: impl Into<String>,
        handler: H,
    ) -> Result<Self, PatternError> {
        Self::new(Method::Get, pattern, handler)
    }

    /// A `HEAD` route.
    pub fn head<H: Handler + 'static>(
        pattern: impl Into<String>,
        handler: H,
    ) -> Result<Self, PatternError> {
        Self::new(Method::Head, pattern, handler)
    }

    /// A `POST` route.
    pub fn post<H: Handler + 'static>(
        pattern: impl Into<String>,
        handler: H,
    ) -> Result<Self, PatternError> {
        Self::new(Method::Post, pattern, handler)
    }

    /// A `PUT` route.
    pub fn put<H: Handler + 'static>(
        pattern: impl Into<String>,
        handler: H,
    ) -> Result<Self, PatternError> {
        Self::new(Method::Put, pattern, handler)
    }

    /// A `DELETE` route.
    pub fn delete<H: Handler + 'static>(
        pattern: impl Into<String>,
        handler: H,
    ) -> Result<Self, PatternError> {
        Self::new(Method::Delete, pattern, handler)
    }

    /// A `PATCH` route.
    pub fn patch<H: Handler + 'static>(
        pattern: impl Into<String>,
        handler: H,
    ) -> Result<Self, PatternError> {
        Self::new(Method::Patch, pattern, handler)
    }

    /// An `OPTIONS` route.
    pub fn options<H: Handler + 'static>(
        pattern: impl Into<String>,
        handler: H,
    ) -> Result<Self, PatternError> {
        Self::new(Method::Options, pattern, handler)
    }

    /// A `TRACE` route.
    pub fn trace<H: Handler + 'static>(
        pattern: impl Into<String>,
        handler: H,
    ) -> Result<Self, PatternError> {
        Self::new(Method::Trace, pattern, handler)
    }

    /// Attach route-scoped middleware; runs after global and group
    /// middleware, in attachment order.
    #[must_use]
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Attach a metadata value under a key. Metadata is inert to
    /// matching; consumers read it for docs, auth policies, and the
    /// like.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Associate this route with the group registered under
    /// `base_path`, inheriting that group's middleware.
    ///
    /// The pattern itself is not rewritten; it must already contain
    /// whatever prefix the route is served under.
    #[must_use]
    pub fn in_group(mut self, base_path: impl Into<String>) -> Self {
        self.group = Some(normalize_prefix(&base_path.into()));
        self
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// The pattern as declared.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The terminal handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Route-scoped middleware, in attachment order.
    #[must_use]
    pub fn middleware_stack(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    /// Attached metadata.
    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }

    /// The group base path this route belongs to, if any.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("group", &self.group)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

/// A group declaration: a base path plus middleware shared by every
/// route that opts into the group.
#[derive(Clone)]
pub struct RouteGroup {
    base_path: String,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl RouteGroup {
    /// Create a group for `base_path` (normalized).
    #[must_use]
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: normalize_prefix(&base_path.into()),
            middleware: Vec::new(),
        }
    }

    /// Attach group middleware; runs between global and route
    /// middleware for member routes.
    #[must_use]
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// The normalized base path, the group's identity.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// The group's middleware, in attachment order.
    #[must_use]
    pub fn middleware_stack(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }
}

impl std::fmt::Debug for RouteGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGroup")
            .field("base_path", &self.base_path)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchback_core::{BoxError, RequestContext, Response};

    async fn noop(_ctx: RequestContext) -> Result<Response, BoxError> {
        Ok(Response::ok())
    }

    #[test]
    fn construction_validates_pattern() {
        assert!(Route::get("/users/:id", noop).is_ok());
        assert!(Route::get("/a/**/b", noop).is_err());
        assert!(Route::get("/users/:", noop).is_err());
    }

    #[test]
    fn sugar_sets_method() {
        assert_eq!(Route::get("/x", noop).unwrap().method(), Method::Get);
        assert_eq!(Route::post("/x", noop).unwrap().method(), Method::Post);
        assert_eq!(Route::delete("/x", noop).unwrap().method(), Method::Delete);
        assert_eq!(Route::trace("/x", noop).unwrap().method(), Method::Trace);
    }

    #[test]
    fn metadata_accumulates() {
        let route = Route::get("/x", noop)
            .unwrap()
            .with_metadata("tag", serde_json::json!("admin"))
            .with_metadata("weight", serde_json::json!(3));
        assert_eq!(route.metadata().len(), 2);
        assert_eq!(route.metadata()["tag"], serde_json::json!("admin"));
    }

    #[test]
    fn group_base_is_normalized() {
        let route = Route::get("/admin/x", noop).unwrap().in_group("admin/");
        assert_eq!(route.group(), Some("/admin"));

        let group = RouteGroup::new("admin/");
        assert_eq!(group.base_path(), "/admin");
    }

    #[test]
    fn clone_shares_handler() {
        let route = Route::get("/x", noop).unwrap();
        let clone = route.clone();
        assert!(Arc::ptr_eq(route.handler(), clone.handler()));
    }
}
