//! Declaration registry.
//!
//! Routes and groups are declared against a registry, then compiled
//! into a [`Dispatcher`](crate::Dispatcher) in one shot. The registry
//! keeps every declaration in order; when two declarations collide
//! (same method and pattern for routes, same base path for groups),
//! the later one is the effective one.
//!
//! [`Registry::global`] hands out a process-wide instance for code
//! that registers routes from module initializers. Library code that
//! wants isolation should build its own `Registry`.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::Mutex;
use switchback_core::Method;

use crate::route::{Route, RouteGroup};

/// A recorded declaration, in registration order.
#[derive(Debug, Clone)]
pub enum Declaration {
    Route(Route),
    Group(RouteGroup),
}

/// An append-only collection of route and group declarations.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<Vec<Declaration>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::new)
    }

    /// Record a route declaration.
    pub fn register_route(&self, route: Route) {
        self.entries.lock().push(Declaration::Route(route));
    }

    /// Record a group declaration.
    pub fn register_group(&self, group: RouteGroup) {
        self.entries.lock().push(Declaration::Group(group));
    }

    /// Every declaration, in registration order, collisions included.
    #[must_use]
    pub fn list(&self) -> Vec<Declaration> {
        self.entries.lock().clone()
    }

    /// Drop all declarations. Mostly useful in tests against
    /// [`Registry::global`].
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Route declarations after redefinition: for each method and
    /// pattern pair, only the latest registration survives. Order
    /// follows the surviving registrations.
    #[must_use]
    pub fn effective_routes(&self) -> Vec<Route> {
        let entries = self.entries.lock();
        let mut winners: HashMap<(Method, &str), (usize, &Route)> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            if let Declaration::Route(route) = entry {
                winners.insert((route.method(), route.pattern()), (idx, route));
            }
        }
        let mut surviving: Vec<(usize, &Route)> = winners.into_values().collect();
        surviving.sort_unstable_by_key(|(idx, _)| *idx);
        surviving.into_iter().map(|(_, route)| route.clone()).collect()
    }

    /// Group declarations after redefinition, keyed by base path.
    #[must_use]
    pub fn effective_groups(&self) -> Vec<RouteGroup> {
        let entries = self.entries.lock();
        let mut winners: HashMap<&str, (usize, &RouteGroup)> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            if let Declaration::Group(group) = entry {
                winners.insert(group.base_path(), (idx, group));
            }
        }
        let mut surviving: Vec<(usize, &RouteGroup)> = winners.into_values().collect();
        surviving.sort_unstable_by_key(|(idx, _)| *idx);
        surviving.into_iter().map(|(_, group)| group.clone()).collect()
    }

    /// Number of recorded declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
