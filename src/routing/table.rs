//! Route table storage and generation swapping.
//!
//! # Responsibilities
//! - Hold compiled route definitions for one generation
//! - Delegate lookups to the matcher (table owns data, matcher owns algorithm)
//! - Publish new generations atomically without blocking readers
//!
//! # Design Decisions
//! - Tables are immutable once published; a reload builds a whole new table
//! - Readers snapshot the generation pointer once per request and use that
//!   snapshot for the full request lifetime
//! - `ArcSwap` gives lock-free reads; writer serialization comes from the
//!   single reload task owning all publishes
//! - Explicit `None` on lookup miss rather than a silent default route

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::Method;

use crate::routing::matcher::{select_route, RouteMatch};
use crate::routing::template::PathTemplate;

/// One compiled route: the upstream pattern it accepts and the downstream
/// authority and path it forwards to.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    pub upstream_template: PathTemplate,
    /// Accepted methods; empty means all methods.
    pub upstream_methods: Vec<Method>,
    pub downstream_template: PathTemplate,
    pub downstream_scheme: String,
    pub downstream_host: String,
    pub downstream_port: u16,
    /// Declaration position, used as the final precedence tiebreaker.
    pub index: usize,
}

impl RouteDefinition {
    pub fn allows_method(&self, method: &Method) -> bool {
        self.upstream_methods.is_empty() || self.upstream_methods.contains(method)
    }

    /// Downstream `host:port` authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.downstream_host, self.downstream_port)
    }
}

/// An immutable, generation-stamped set of routes.
#[derive(Debug)]
pub struct RouteTable {
    generation: u64,
    routes: Vec<RouteDefinition>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteDefinition>, generation: u64) -> Self {
        Self { generation, routes }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    /// Find the best route for a request. Pure delegation to the matcher.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        select_route(&self.routes, method, path)
    }
}

/// Shared handle to the active route table.
///
/// Cloned cheaply into every handler via `Arc`; reads never block and a
/// publish never invalidates a snapshot already taken.
#[derive(Debug)]
pub struct SharedRouteTable {
    inner: ArcSwap<RouteTable>,
}

impl SharedRouteTable {
    /// Create the handle with its first generation.
    pub fn new(routes: Vec<RouteDefinition>) -> Self {
        Self {
            inner: ArcSwap::from_pointee(RouteTable::new(routes, 1)),
        }
    }

    /// Snapshot the current generation. One atomic load.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.inner.load_full()
    }

    /// Publish a fully-built replacement table. Returns its generation.
    ///
    /// Must only be called from the single reload path; concurrent readers
    /// keep whatever snapshot they already hold.
    pub fn publish(&self, routes: Vec<RouteDefinition>) -> u64 {
        let generation = self.inner.load().generation() + 1;
        self.inner
            .store(Arc::new(RouteTable::new(routes, generation)));
        generation
    }
}
