//! Backtracking route trie.
//!
//! One node per path depth, with children bucketed by kind. At each
//! node, candidates are tried in priority order:
//!
//! 1. literal child (exact, still-encoded segment text)
//! 2. constrained children, longest constraint source first
//! 3. the parameter child
//! 4. the wildcard child
//! 5. the catch-all child
//!
//! A dead end backtracks to the next candidate, so a literal branch
//! that fizzles deeper down never hides a parameter route that would
//! have matched. Matching compares encoded text; captured values are
//! percent-decoded exactly once, when parameters are bound.
//!
//! Parameter and constrained children are shared structurally: the
//! trie does not care what `/users/:id/orders` calls its parameter
//! versus `/users/:name/profile`. Each terminal records its own
//! depth-to-name table, applied to the capture stack on a hit.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use switchback_core::{Method, percent_decode_path};

use crate::pattern::Segment;
use crate::r#match::{AllowedMethods, RouteLookup, RouteMatch};
use crate::route::Route;

/// The route table: immutable after build, lock-free to query.
#[derive(Debug, Default)]
pub struct RouteTrie {
    root: TrieNode,
}

#[derive(Debug, Default)]
struct TrieNode {
    literals: HashMap<String, TrieNode>,
    // Ordered by raw constraint length, longest first; ties keep
    // insertion order.
    constraints: Vec<ConstraintChild>,
    param: Option<Box<TrieNode>>,
    wildcard: Option<Box<TrieNode>>,
    catch_all: Option<Box<TrieNode>>,
    terminals: HashMap<Method, Terminal>,
}

#[derive(Debug)]
struct ConstraintChild {
    raw: String,
    regex: Regex,
    node: TrieNode,
}

#[derive(Debug)]
struct Terminal {
    route: Arc<Route>,
    // depth -> parameter name, for every capturing segment on the
    // path to this terminal.
    names: Vec<(usize, String)>,
}

enum Walk<'t> {
    Hit {
        terminal: &'t Terminal,
        // Raw joined remainder for a catch-all hit; empty string for
        // the zero-segment claim.
        catch_all: Option<String>,
    },
    Blocked {
        allowed: AllowedMethods,
    },
    Miss,
}

impl TrieNode {
    fn param_child(&mut self) -> &mut TrieNode {
        self.param.get_or_insert_with(Box::default)
    }

    fn wildcard_child(&mut self) -> &mut TrieNode {
        self.wildcard.get_or_insert_with(Box::default)
    }

    fn catch_all_child(&mut self) -> &mut TrieNode {
        self.catch_all.get_or_insert_with(Box::default)
    }

    fn constraint_child(&mut self, raw: &str, regex: &Regex) -> &mut TrieNode {
        let idx = match self.constraints.iter().position(|c| c.raw == raw) {
            Some(idx) => idx,
            None => {
                let at = self
                    .constraints
                    .iter()
                    .position(|c| c.raw.len() < raw.len())
                    .unwrap_or(self.constraints.len());
                self.constraints.insert(
                    at,
                    ConstraintChild {
                        raw: raw.to_string(),
                        regex: regex.clone(),
                        node: TrieNode::default(),
                    },
                );
                at
            }
        };
        &mut self.constraints[idx].node
    }
}

impl RouteTrie {
    /// Create an empty trie.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a route. A later insert with the same method and
    /// structural path replaces the earlier terminal.
    pub fn insert(&mut self, route: Arc<Route>) {
        let mut names = Vec::new();
        let mut node = &mut self.root;
        for (depth, segment) in route.segments().iter().enumerate() {
            match segment {
                Segment::Literal(text) => {
                    node = node.literals.entry(text.clone()).or_default();
                }
                Segment::Param(name) => {
                    names.push((depth, name.clone()));
                    node = node.param_child();
                }
                Segment::Constrained { name, raw, regex } => {
                    names.push((depth, name.clone()));
                    node = node.constraint_child(raw, regex);
                }
                Segment::Wildcard => {
                    node = node.wildcard_child();
                }
                Segment::CatchAll => {
                    node = node.catch_all_child();
                }
            }
        }
        node.terminals.insert(route.method(), Terminal { route, names });
    }

    /// Look up a path (router-relative, still percent-encoded) for a
    /// method.
    ///
    /// End-of-input resolution order at a node: own terminal for the
    /// method, a trailing catch-all claiming the empty remainder,
    /// then 405 over the union of both method sets, then backtrack.
    #[must_use]
    pub fn find<'a>(&'a self, path: &str, method: Method) -> RouteLookup<'a> {
        let segs: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut captures: Vec<Option<&str>> = vec![None; segs.len()];
        match walk(&self.root, &segs, 0, method, &mut captures) {
            Walk::Hit {
                terminal,
                catch_all,
            } => {
                let params = bind_params(terminal, &captures, catch_all);
                RouteLookup::Match(RouteMatch {
                    route: terminal.route.as_ref(),
                    params,
                })
            }
            Walk::Blocked { allowed } => RouteLookup::MethodNotAllowed { allowed },
            Walk::Miss => RouteLookup::NotFound,
        }
    }
}

fn walk<'t, 'p>(
    node: &'t TrieNode,
    segs: &[&'p str],
    depth: usize,
    method: Method,
    captures: &mut Vec<Option<&'p str>>,
) -> Walk<'t> {
    if depth == segs.len() {
        return resolve_end(node, method);
    }
    let seg = segs[depth];

    if let Some(child) = node.literals.get(seg) {
        match walk(child, segs, depth + 1, method, captures) {
            Walk::Miss => {}
            hit => return hit,
        }
    }

    for child in &node.constraints {
        if child.regex.is_match(seg) {
            captures[depth] = Some(seg);
            match walk(&child.node, segs, depth + 1, method, captures) {
                Walk::Miss => captures[depth] = None,
                hit => return hit,
            }
        }
    }

    if let Some(child) = &node.param {
        captures[depth] = Some(seg);
        match walk(child, segs, depth + 1, method, captures) {
            Walk::Miss => captures[depth] = None,
            hit => return hit,
        }
    }

    if let Some(child) = &node.wildcard {
        match walk(child, segs, depth + 1, method, captures) {
            Walk::Miss => {}
            hit => return hit,
        }
    }

    if let Some(child) = &node.catch_all {
        if let Some(terminal) = child.terminals.get(&method) {
            return Walk::Hit {
                terminal,
                catch_all: Some(segs[depth..].join("/")),
            };
        }
        if !child.terminals.is_empty() {
            return Walk::Blocked {
                allowed: allowed_of(child),
            };
        }
    }

    Walk::Miss
}

fn resolve_end<'t>(node: &'t TrieNode, method: Method) -> Walk<'t> {
    if let Some(terminal) = node.terminals.get(&method) {
        return Walk::Hit {
            terminal,
            catch_all: None,
        };
    }
    // A trailing catch-all may claim the empty remainder.
    if let Some(child) = &node.catch_all {
        if let Some(terminal) = child.terminals.get(&method) {
            return Walk::Hit {
                terminal,
                catch_all: Some(String::new()),
            };
        }
    }
    // Both the node's own terminals and a catch-all's empty claim
    // would have served this path, so the allow set is their union.
    let mut methods: Vec<Method> = node.terminals.keys().copied().collect();
    if let Some(child) = &node.catch_all {
        methods.extend(child.terminals.keys().copied());
    }
    if !methods.is_empty() {
        return Walk::Blocked {
            allowed: AllowedMethods::new(methods),
        };
    }
    Walk::Miss
}

fn allowed_of(node: &TrieNode) -> AllowedMethods {
    AllowedMethods::new(node.terminals.keys().copied().collect())
}

fn bind_params(
    terminal: &Terminal,
    captures: &[Option<&str>],
    catch_all: Option<String>,
) -> HashMap<String, String> {
    let mut params =
        HashMap::with_capacity(terminal.names.len() + usize::from(catch_all.is_some()));
    for (depth, name) in &terminal.names {
        if let Some(raw) = captures.get(*depth).copied().flatten() {
            params.insert(name.clone(), percent_decode_path(raw).into_owned());
        }
    }
    if let Some(remainder) = catch_all {
        params.insert(
            String::from("*"),
            percent_decode_path(&remainder).into_owned(),
        );
    }
    params
}
