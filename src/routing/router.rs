//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store the current route table snapshot
//! - Look up the route with the globally longest matching prefix
//! - Swap in a new snapshot on configuration reload
//!
//! # Design Decisions
//! - Snapshots are immutable (thread-safe without locks)
//! - O(n) prefix scan (acceptable for typical route counts)
//! - Ties across routes go to the first route in table order
//! - Explicit no-match rather than silent default

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::RouteConfig;
use crate::routing::route::{RouteDefinition, RouteError};

/// Result of a successful lookup.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDefinition,
    pub matched_prefix: &'a str,
}

impl RouteMatch<'_> {
    /// Path to request downstream for the inbound `path`.
    pub fn downstream_path(&self, path: &str) -> String {
        self.route.rewrite_path(path, self.matched_prefix)
    }
}

/// Immutable, ordered set of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDefinition>,
}

impl RouteTable {
    /// Create a table, rejecting duplicate route ids.
    pub fn new(routes: Vec<RouteDefinition>) -> Result<Self, RouteError> {
        let mut seen = HashSet::new();
        for route in &routes {
            if !seen.insert(route.id()) {
                return Err(RouteError::DuplicateId {
                    route: route.id().to_string(),
                });
            }
        }
        Ok(Self { routes })
    }

    /// Build a table from configuration, failing on the first invalid route.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, RouteError> {
        let routes = configs
            .iter()
            .map(RouteDefinition::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(routes)
    }

    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route whose matching prefix is the longest across the table.
    pub fn find_best_match(&self, path: &str) -> Option<RouteMatch<'_>> {
        let mut best: Option<RouteMatch<'_>> = None;
        for route in &self.routes {
            let Some(matched) = route.best_matching_prefix(path) else {
                continue;
            };
            if best.map_or(true, |b| matched.len() > b.matched_prefix.len()) {
                best = Some(RouteMatch {
                    route,
                    matched_prefix: matched,
                });
            }
        }
        best
    }
}

/// Source of the route table, read once per request.
pub trait RouteSource: Send + Sync {
    fn current_routes(&self) -> Arc<RouteTable>;
}

/// Route table that can be replaced atomically while requests are in flight.
#[derive(Debug)]
pub struct SharedRouteTable {
    current: ArcSwap<RouteTable>,
}

impl SharedRouteTable {
    pub fn new(table: RouteTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    /// Replace the snapshot; readers holding the old one keep it.
    pub fn replace(&self, table: RouteTable) {
        tracing::info!(routes = table.len(), "Route table replaced");
        self.current.store(Arc::new(table));
    }
}

impl RouteSource for SharedRouteTable {
    fn current_routes(&self) -> Arc<RouteTable> {
        self.current.load_full()
    }
}
