//! Route table
//!
//! A method-aware radix tree over path segments, compiled once per load and
//! published behind an atomic reference by the gateway. Lookup walks the
//! request path segment by segment; literal children win over `:name`
//! captures, which win over a trailing `*name` wildcard. The tree is
//! immutable after `build`, so readers share it without synchronization.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SchemaError};
use crate::route::{Method, ObjectKind, Route, Volatility};

/// A matched route plus its captured path parameters
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Arc<Route>,
    /// Placeholder name to raw (undecoded) path value
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct Node {
    literals: HashMap<String, Node>,
    /// `:name` child: capture name plus subtree
    param: Option<(String, Box<Node>)>,
    /// `*name` terminal: capture name plus per-method routes
    wildcard: Option<(String, HashMap<Method, Arc<Route>>)>,
    routes: HashMap<Method, Arc<Route>>,
}

/// Immutable snapshot of all routes
#[derive(Debug, Default)]
pub struct RouteTable {
    root: Node,
    len: usize,
}

impl RouteTable {
    /// Compile routes into a lookup tree.
    ///
    /// # Errors
    ///
    /// Rejects duplicate (method, path) pairs, misplaced wildcards, and GET
    /// routes on volatile procedures.
    pub fn build(routes: Vec<Route>) -> Result<Self> {
        let mut table = RouteTable::default();

        for route in routes {
            if let (Method::Get, ObjectKind::Procedure) = (route.method, route.kind) {
                let volatile = route
                    .procedure
                    .as_ref()
                    .is_none_or(|p| p.volatility == Volatility::Volatile);
                if volatile {
                    return Err(SchemaError::VolatileGet {
                        procedure: route.object_name.clone(),
                        volatility: 'v',
                    });
                }
            }

            table.insert(route)?;
        }

        Ok(table)
    }

    /// Number of routes in the table
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the table holds no routes
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn insert(&mut self, route: Route) -> Result<()> {
        let method = route.method;
        let url_path = route.url_path.clone();
        let segments: Vec<&str> = segments_of(&url_path);

        let mut node = &mut self.root;
        for (i, segment) in segments.iter().enumerate() {
            if let Some(name) = segment.strip_prefix('*') {
                if i + 1 != segments.len() {
                    return Err(SchemaError::InvalidPattern {
                        url_path,
                        reason: "wildcard must be the last segment",
                    });
                }
                if name.is_empty() {
                    return Err(SchemaError::InvalidPattern {
                        url_path,
                        reason: "wildcard needs a name",
                    });
                }

                let (existing, methods) = node
                    .wildcard
                    .get_or_insert_with(|| (name.to_string(), HashMap::new()));
                if existing != name {
                    return Err(SchemaError::InvalidPattern {
                        url_path,
                        reason: "conflicting wildcard names at the same position",
                    });
                }
                if methods.insert(method, Arc::new(route)).is_some() {
                    return Err(SchemaError::DuplicateRoute {
                        method: method.as_str().to_string(),
                        url_path,
                    });
                }
                self.len += 1;
                return Ok(());
            }

            node = if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() {
                    return Err(SchemaError::InvalidPattern {
                        url_path,
                        reason: "parameter needs a name",
                    });
                }
                let (existing, child) = node
                    .param
                    .get_or_insert_with(|| (name.to_string(), Box::default()));
                if existing != name {
                    return Err(SchemaError::InvalidPattern {
                        url_path,
                        reason: "conflicting parameter names at the same position",
                    });
                }
                child.as_mut()
            } else {
                node.literals.entry(segment.to_string()).or_default()
            };
        }

        if node.routes.insert(method, Arc::new(route)).is_some() {
            return Err(SchemaError::DuplicateRoute {
                method: method.as_str().to_string(),
                url_path,
            });
        }
        self.len += 1;
        Ok(())
    }

    /// Look up a request path. Returns the route and raw captures, or None.
    pub fn lookup(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        let segments: Vec<&str> = segments_of(path);
        let mut params = Vec::new();
        let route = match_node(&self.root, method, &segments, &mut params)?;
        Some(RouteMatch { route, params })
    }
}

/// Path split: a single `/` (or empty path) has no segments
fn segments_of(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

fn match_node<'t>(
    node: &'t Node,
    method: Method,
    segments: &[&str],
    params: &mut Vec<(String, String)>,
) -> Option<&'t Arc<Route>> {
    match segments.split_first() {
        None => node.routes.get(&method),
        Some((head, tail)) => {
            if let Some(child) = node.literals.get(*head) {
                let depth = params.len();
                if let Some(route) = match_node(child, method, tail, params) {
                    return Some(route);
                }
                params.truncate(depth);
            }

            if let Some((name, child)) = &node.param {
                let depth = params.len();
                params.push((name.clone(), (*head).to_string()));
                if let Some(route) = match_node(child, method, tail, params) {
                    return Some(route);
                }
                params.truncate(depth);
            }

            if let Some((name, methods)) = &node.wildcard {
                if let Some(route) = methods.get(&method) {
                    params.push((name.clone(), segments.join("/")));
                    return Some(route);
                }
            }

            None
        }
    }
}
