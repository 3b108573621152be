//! Route lookup results.

use std::collections::HashMap;

use switchback_core::Method;

use crate::route::Route;

/// A matched route with its decoded parameters.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// The matched route.
    pub route: &'a Route,
    /// Captured path parameters, percent-decoded. A catch-all match
    /// appears under the implicit name `*`.
    pub params: HashMap<String, String>,
}

impl RouteMatch<'_> {
    /// Get a captured parameter value by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Result of attempting to locate a route by path and method.
#[derive(Debug)]
pub enum RouteLookup<'a> {
    /// A route matched by path and method.
    Match(RouteMatch<'a>),
    /// Path matched, but not for this method.
    MethodNotAllowed {
        /// The methods that would have matched.
        allowed: AllowedMethods,
    },
    /// No route matched the path.
    NotFound,
}

/// The allow list reported with a 405.
///
/// Holds exactly the methods registered at the matched node, in
/// canonical order and de-duplicated; nothing is inferred (a GET
/// route does not imply HEAD).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedMethods {
    methods: Vec<Method>,
}

impl AllowedMethods {
    /// Create a normalized allow list: sorted canonically, de-duplicated.
    #[must_use]
    pub fn new(mut methods: Vec<Method>) -> Self {
        methods.sort_by_key(|m| method_order(*m));
        methods.dedup();
        Self { methods }
    }

    /// Access the normalized methods.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Check whether a method is in the list.
    #[must_use]
    pub fn contains(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    /// Format as an HTTP `Allow` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        let mut out = String::new();
        for (idx, method) in self.methods.iter().enumerate() {
            if idx > 0 {
                out.push_str(", ");
            }
            out.push_str(method.as_str());
        }
        out
    }
}

fn method_order(method: Method) -> u8 {
    match method {
        Method::Get => 0,
        Method::Head => 1,
        Method::Post => 2,
        Method::Put => 3,
        Method::Delete => 4,
        Method::Patch => 5,
        Method::Options => 6,
        Method::Trace => 7,
    }
}
