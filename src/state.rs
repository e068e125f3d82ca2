//! Shared application state for Axum handlers.
//!
//! # Thread Safety
//!
//! Every component is behind an `Arc` or is itself cheap to clone, so the
//! state is cloned into each handler. The metrics registry is the only
//! mutable state shared between requests and is internally synchronized.

use std::sync::Arc;

use crate::config::Config;
use crate::health::{HealthChecker, Pinger};
use crate::metrics::HttpMetrics;
use crate::store::PersonStore;

/// Name under which the person database is reported by `GET /health`.
pub const DATABASE_DEPENDENCY: &str = "postgres";

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Person persistence
    pub store: Arc<dyn PersonStore>,
    /// Dependency health checks for `/health`
    pub health: HealthChecker,
    /// HTTP metrics registry, shared with the metrics middleware
    pub metrics: Arc<HttpMetrics>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create state around `store`, which is also registered as the
    /// database health dependency. A fresh metrics registry is created.
    pub fn new<S>(store: Arc<S>, config: Config) -> Self
    where
        S: PersonStore + Pinger + 'static,
    {
        let health = HealthChecker::new(config.health_check_timeout)
            .with_dependency(DATABASE_DEPENDENCY, store.clone());

        Self {
            store,
            health,
            metrics: Arc::new(HttpMetrics::new()),
            config: Arc::new(config),
        }
    }

    /// Replace the metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<HttpMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replace the health checker.
    pub fn with_health(mut self, health: HealthChecker) -> Self {
        self.health = health;
        self
    }
}
