//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in file order, first full match wins
//! - Explicit NoMatch rather than silent default
//! - MCP/TOOL entries never answer plain HTTP requests

use std::sync::Arc;

use axum::http::Method;

use crate::routing::definition::RouteDefinition;
use crate::routing::matcher::PathParams;
use crate::routing::table::RouteTable;

/// A matched route with its bound path parameters.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteDefinition>,
    pub params: PathParams,
}

#[derive(Debug, Clone)]
pub enum MatchResult {
    Matched(RouteMatch),
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    table: RouteTable,
}

impl Router {
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn match_route(&self, method: &Method, path: &str) -> MatchResult {
        for route in self.table.web_routes() {
            if route.verb.http_method().as_ref() != Some(method) {
                continue;
            }
            let Some(pattern) = route.path_pattern() else {
                continue;
            };
            if let Some(params) = pattern.matches(path) {
                return MatchResult::Matched(RouteMatch {
                    route: route.clone(),
                    params,
                });
            }
        }
        MatchResult::NotFound
    }

    /// The first fallback route declared for `status` (404 or 500).
    pub fn fallback(&self, status: u16) -> Option<Arc<RouteDefinition>> {
        self.table
            .web_routes()
            .find(|route| route.fallback_status() == Some(status))
            .cloned()
    }
}
