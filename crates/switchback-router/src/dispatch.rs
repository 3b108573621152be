//! Request dispatch pipeline.
//!
//! The [`Dispatcher`] is the compiled form of a set of declarations:
//! a route trie, the resolved group middleware, and the configured
//! fallbacks. Dispatching a request runs base-path stripping, trie
//! lookup, middleware chaining, and the endpoint handler, and always
//! produces a response.
//!
//! A dispatcher is immutable after [`DispatcherBuilder::build`], so a
//! host can share one behind an `Arc` and dispatch from any number of
//! tasks concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use switchback_core::{
    Method, Middleware, Next, Request, RequestContext, Response, StatusCode,
};

use crate::config::DispatcherConfig;
use crate::r#match::{AllowedMethods, RouteLookup};
use crate::registry::{Declaration, Registry};
use crate::route::{Route, RouteGroup};
use crate::trie::RouteTrie;

// ============================================================================
// Builder
// ============================================================================

/// Collects declarations and configuration, then compiles them.
#[derive(Default)]
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    global: Vec<Arc<dyn Middleware>>,
    groups: Vec<RouteGroup>,
    routes: Vec<Route>,
}

impl DispatcherBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dispatcher configuration.
    #[must_use]
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a global middleware. Global middleware wrap every
    /// matched route, outermost first in registration order.
    #[must_use]
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.global.push(Arc::new(middleware));
        self
    }

    /// Declare a group. A later group with the same base path
    /// replaces the earlier one.
    #[must_use]
    pub fn group(mut self, group: RouteGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Declare a route. A later route with the same method and
    /// pattern replaces the earlier one.
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Pull every declaration out of a registry, in registration
    /// order, as if each had been passed to [`Self::route`] or
    /// [`Self::group`].
    #[must_use]
    pub fn routes_from(mut self, registry: &Registry) -> Self {
        for declaration in registry.list() {
            match declaration {
                Declaration::Route(route) => self.routes.push(route),
                Declaration::Group(group) => self.groups.push(group),
            }
        }
        self
    }

    /// Compile the declarations into an immutable dispatcher.
    #[must_use]
    pub fn build(self) -> Dispatcher {
        let mut group_middleware: HashMap<String, Vec<Arc<dyn Middleware>>> = HashMap::new();
        for group in self.groups {
            group_middleware.insert(
                group.base_path().to_string(),
                group.middleware_stack().to_vec(),
            );
        }

        // Same-method, same-pattern redefinition: the last declaration
        // survives, keeping its position in the surviving order.
        let mut winners: HashMap<(Method, &str), usize> = HashMap::new();
        for (idx, route) in self.routes.iter().enumerate() {
            winners.insert((route.method(), route.pattern()), idx);
        }
        let mut keep: Vec<usize> = winners.into_values().collect();
        keep.sort_unstable();

        let mut slots: Vec<Option<Route>> = self.routes.iter().cloned().map(Some).collect();
        let routes: Vec<Arc<Route>> = keep
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .map(Arc::new)
            .collect();

        let mut trie = RouteTrie::new();
        for route in &routes {
            trie.insert(Arc::clone(route));
        }

        Dispatcher {
            trie,
            routes,
            group_middleware,
            global: self.global,
            config: self.config,
        }
    }
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("routes", &self.routes.len())
            .field("groups", &self.groups.len())
            .field("global_middleware", &self.global.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// The compiled routing engine.
pub struct Dispatcher {
    trie: RouteTrie,
    routes: Vec<Arc<Route>>,
    group_middleware: HashMap<String, Vec<Arc<dyn Middleware>>>,
    global: Vec<Arc<dyn Middleware>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Start building a dispatcher.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Route one request to completion.
    ///
    /// Never fails: misses become 404, method mismatches become 405
    /// with an `allow` header, and handler errors become 500 (or
    /// whatever the configured producers return).
    pub async fn dispatch(&self, request: Request) -> Response {
        let method = request.method();
        let Some(path) = strip_base(self.config.base_path_str(), request.path()) else {
            if self.config.debug_enabled() {
                tracing::debug!(
                    target: "switchback::dispatch",
                    %method,
                    path = request.path(),
                    "outside base path"
                );
            }
            return self.not_found_response(&request);
        };
        let path = path.to_string();

        match self.trie.find(&path, method) {
            RouteLookup::NotFound => {
                if self.config.debug_enabled() {
                    tracing::debug!(
                        target: "switchback::dispatch",
                        %method,
                        path = %path,
                        "no route"
                    );
                }
                self.not_found_response(&request)
            }
            RouteLookup::MethodNotAllowed { allowed } => {
                if self.config.debug_enabled() {
                    tracing::debug!(
                        target: "switchback::dispatch",
                        %method,
                        path = %path,
                        allow = %allowed.header_value(),
                        "method not allowed"
                    );
                }
                method_not_allowed_response(&allowed)
            }
            RouteLookup::Match(found) => {
                let route = found.route;
                let params = found.params;
                if self.config.debug_enabled() {
                    tracing::debug!(
                        target: "switchback::dispatch",
                        %method,
                        path = %path,
                        pattern = route.pattern(),
                        "matched"
                    );
                }
                let ctx = RequestContext::new(request, params);
                let chain = self.chain_for(route);
                let next = Next::new(chain, Arc::clone(route.handler()));
                match next.run(ctx.clone()).await {
                    Ok(response) => response,
                    Err(err) => {
                        tracing::error!(
                            target: "switchback::dispatch",
                            %method,
                            path = %path,
                            pattern = route.pattern(),
                            error = %err,
                            "handler failed"
                        );
                        match self.config.error_handler_fn() {
                            Some(producer) => producer(&err, &ctx),
                            // Default 500s carry no body.
                            None => Response::new(StatusCode::INTERNAL_SERVER_ERROR),
                        }
                    }
                }
            }
        }
    }

    /// Look up a router-relative path (base path already stripped)
    /// without running middleware or handlers.
    #[must_use]
    pub fn lookup<'a>(&'a self, path: &str, method: Method) -> RouteLookup<'a> {
        self.trie.find(path, method)
    }

    /// The routes this dispatcher serves, in surviving declaration
    /// order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|route| route.as_ref())
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn not_found_response(&self, request: &Request) -> Response {
        match self.config.not_found_handler() {
            Some(producer) => producer(request),
            None => Response::text("Not Found").with_status(StatusCode::NOT_FOUND),
        }
    }

    fn chain_for(&self, route: &Route) -> Arc<[Arc<dyn Middleware>]> {
        let group = route
            .group()
            .and_then(|base| self.group_middleware.get(base));
        let mut chain: Vec<Arc<dyn Middleware>> = Vec::with_capacity(
            self.global.len()
                + group.map_or(0, Vec::len)
                + route.middleware_stack().len(),
        );
        chain.extend(self.global.iter().cloned());
        if let Some(group) = group {
            chain.extend(group.iter().cloned());
        }
        chain.extend(route.middleware_stack().iter().cloned());
        chain.into()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.len())
            .field("groups", &self.group_middleware.len())
            .field("global_middleware", &self.global.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn method_not_allowed_response(allowed: &AllowedMethods) -> Response {
    Response::text("Method Not Allowed")
        .with_status(StatusCode::METHOD_NOT_ALLOWED)
        .header("allow", allowed.header_value())
}

/// Strip the configured base path at a segment boundary. `None` means
/// the request path lies outside the base entirely.
fn strip_base<'a>(base: &str, path: &'a str) -> Option<&'a str> {
    if base.is_empty() {
        return Some(path);
    }
    if path == base {
        return Some("/");
    }
    let rest = path.strip_prefix(base)?;
    if rest.starts_with('/') { Some(rest) } else { None }
}
