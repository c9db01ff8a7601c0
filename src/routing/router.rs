//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in evaluation order
//! - Look up the matching route for a path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (only pool cursors mutate)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Ordered: priority, then longest prefix, then configuration order

use thiserror::Error;

use crate::config::RouteConfig;
use crate::load_balancer::{BackendPool, PoolError};
use crate::routing::matcher::PathPrefixMatcher;

/// Error building the route table.
#[derive(Debug, Error)]
#[error("route '{prefix}': {source}")]
pub struct RouteError {
    pub prefix: String,
    #[source]
    pub source: PoolError,
}

/// A compiled route: prefix matcher, metric label and backend pool.
#[derive(Debug)]
pub struct Route {
    name: String,
    matcher: PathPrefixMatcher,
    priority: u32,
    pool: BackendPool,
}

impl Route {
    /// Compile a single route from configuration.
    pub fn from_config(config: &RouteConfig) -> Result<Self, RouteError> {
        let pool = BackendPool::from_addresses(&config.backends).map_err(|source| RouteError {
            prefix: config.path_prefix.clone(),
            source,
        })?;
        Ok(Self {
            name: config.label(),
            matcher: PathPrefixMatcher::new(config.path_prefix.clone()),
            priority: config.priority,
            pool,
        })
    }

    /// Metric label for this route.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }
}

/// Ordered, immutable table of routes.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile routes from configuration. Any empty or invalid pool fails the whole table.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, RouteError> {
        let mut routes = configs
            .iter()
            .map(Route::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        // Stable sort keeps configuration order for equal keys.
        routes.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.matcher.specificity().cmp(&a.matcher.specificity()))
        });

        for route in &routes {
            tracing::debug!(
                prefix = %route.prefix(),
                name = %route.name(),
                backends = route.pool.len(),
                "Route compiled"
            );
        }

        Ok(Self { routes })
    }

    /// Find the route for `path`, if any.
    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matcher.matches(path))
    }

    /// Routes in evaluation order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
