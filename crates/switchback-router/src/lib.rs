//! Trie-based HTTP request router.
//!
//! This crate turns route declarations into a compiled [`Dispatcher`]
//! that resolves each request through a backtracking trie.
//!
//! # Features
//!
//! - Literal, `:param`, `:param(regex)`, `*`, and `**` segments
//! - Ordered backtracking, most-specific candidate first
//! - 405 responses with an exact `allow` set
//! - Global, group, and per-route middleware chaining
//! - Redefinition: the last route declared for a method and pattern wins

#![warn(unsafe_code)]

mod config;
mod dispatch;
mod r#match;
mod pattern;
mod registry;
mod route;
mod trie;

pub use config::{DispatcherConfig, ErrorHandler, NotFoundHandler};
pub use dispatch::{Dispatcher, DispatcherBuilder};
pub use r#match::{AllowedMethods, RouteLookup, RouteMatch};
pub use pattern::{PatternError, Segment, normalize_prefix, parse_pattern};
pub use registry::{Declaration, Registry};
pub use route::{Route, RouteGroup};
pub use trie::RouteTrie;
