//! Request context handed to middleware and handlers.
//!
//! [`RequestContext`] bundles the request envelope with everything the
//! dispatcher derived from it: decoded path parameters, the parsed
//! query multimap, the per-request state map, and the abort signal.
//! Cloning is cheap (all interior data is shared), and every clone
//! observes the same state map and body.
//!
//! # Example
//!
//! ```ignore
//! async fn handler(ctx: RequestContext) -> Result<Response, BoxError> {
//!     let id = ctx.param("id").unwrap_or("unknown");
//!     Ok(Response::text(format!("user {id}")))
//! }
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::abort::AbortSignal;
use crate::method::Method;
use crate::query::QueryMap;
use crate::request::{Body, Request};

/// Type-keyed storage scoped to one request.
///
/// Middleware deposits values (an authenticated user, a trace id) and
/// later stages retrieve them by type. Values are cloned out on read,
/// so anything stored here should be cheap to clone or wrapped in an
/// `Arc`.
#[derive(Clone, Default)]
pub struct StateMap {
    inner: Arc<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl StateMap {
    /// Create an empty state map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous value of the same type.
    pub fn insert<T: Any + Send + Sync>(&self, value: T) {
        self.inner.write().insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieve a clone of the stored value of type `T`.
    #[must_use]
    pub fn get<T: Any + Send + Sync + Clone>(&self) -> Option<T> {
        self.inner
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
            .cloned()
    }

    /// Remove and return the stored value of type `T`.
    #[must_use]
    pub fn remove<T: Any + Send + Sync>(&self) -> Option<T> {
        self.inner
            .write()
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Whether a value of type `T` is stored.
    #[must_use]
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.inner.read().contains_key(&TypeId::of::<T>())
    }
}

impl std::fmt::Debug for StateMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMap")
            .field("len", &self.inner.read().len())
            .finish_non_exhaustive()
    }
}

/// Everything one request's handlers get to see.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: Arc<Request>,
    params: Arc<HashMap<String, String>>,
    query: Arc<QueryMap>,
    state: StateMap,
    abort: AbortSignal,
}

impl RequestContext {
    /// Build a context from a request envelope and the parameters
    /// captured during matching.
    ///
    /// Host-provided parameters are merged in first, then captured
    /// path parameters; a captured parameter wins over a host
    /// parameter with the same name.
    #[must_use]
    pub fn new(request: Request, captured: HashMap<String, String>) -> Self {
        let mut params = request.host_params().clone();
        params.extend(captured);
        let query = request
            .raw_query()
            .map(QueryMap::parse)
            .unwrap_or_default();
        let abort = request.abort_signal();
        Self {
            request: Arc::new(request),
            params: Arc::new(params),
            query: Arc::new(query),
            state: StateMap::new(),
            abort,
        }
    }

    /// The request envelope.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.request.method()
    }

    /// The request path (as received, including any base path).
    #[must_use]
    pub fn path(&self) -> &str {
        self.request.path()
    }

    /// A path (or host) parameter by name, already percent-decoded.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All parameters visible to this request.
    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// The decoded query multimap.
    #[must_use]
    pub fn query(&self) -> &QueryMap {
        &self.query
    }

    /// First value for a query key.
    #[must_use]
    pub fn query_first(&self, name: &str) -> Option<&str> {
        self.query.get(name)
    }

    /// Every value for a query key, in order of appearance.
    pub fn query_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.query.get_all(name)
    }

    /// The raw, undecoded query string, if the request had one.
    #[must_use]
    pub fn raw_query(&self) -> Option<&str> {
        self.request.raw_query()
    }

    /// The per-request state map, shared across clones.
    #[must_use]
    pub fn state(&self) -> &StateMap {
        &self.state
    }

    /// Consume the request body. A second call yields `Body::Empty`.
    #[must_use]
    pub fn take_body(&self) -> Body {
        self.request.take_body()
    }

    /// Whether the client has gone away.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// The abort signal for this request.
    #[must_use]
    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_for(target: &str) -> RequestContext {
        RequestContext::new(Request::new(Method::Get, target), HashMap::new())
    }

    #[test]
    fn query_is_parsed_from_request() {
        let ctx = context_for("/items?tag=a&tag=b");
        assert_eq!(ctx.query().get("tag"), Some("a"));
        let all: Vec<_> = ctx.query().get_all("tag").collect();
        assert_eq!(all, vec!["a", "b"]);
    }

    #[test]
    fn missing_query_yields_empty_map() {
        let ctx = context_for("/items");
        assert!(ctx.query().is_empty());
    }

    #[test]
    fn captured_params_override_host_params() {
        let mut request = Request::new(Method::Get, "/users/42");
        request.insert_host_param("id", "from-host");
        request.insert_host_param("tenant", "acme");
        let captured = HashMap::from([(String::from("id"), String::from("42"))]);
        let ctx = RequestContext::new(request, captured);
        assert_eq!(ctx.param("id"), Some("42"));
        assert_eq!(ctx.param("tenant"), Some("acme"));
    }

    #[test]
    fn state_is_shared_across_clones() {
        let ctx = context_for("/");
        let clone = ctx.clone();
        ctx.state().insert(7_u32);
        assert_eq!(clone.state().get::<u32>(), Some(7));
        assert_eq!(clone.state().remove::<u32>(), Some(7));
        assert!(!ctx.state().contains::<u32>());
    }

    #[test]
    fn body_consumed_through_any_clone() {
        let mut request = Request::new(Method::Post, "/upload");
        request.set_body(Body::Bytes(b"data".to_vec()));
        let ctx = RequestContext::new(request, HashMap::new());
        let clone = ctx.clone();
        assert_eq!(clone.take_body().into_bytes(), b"data");
        assert!(ctx.take_body().is_empty());
    }

    #[test]
    fn abort_visible_through_context() {
        let request = Request::new(Method::Get, "/");
        let handle = request.abort_handle();
        let ctx = RequestContext::new(request, HashMap::new());
        assert!(!ctx.is_aborted());
        handle.abort();
        assert!(ctx.is_aborted());
    }
}
