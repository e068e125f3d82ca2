//! Dependency health aggregation for `GET /health`.
//!
//! A [`HealthChecker`] pings every registered dependency concurrently, each
//! bounded by a timeout, and folds the answers into a [`HealthReport`]:
//!
//! ```json
//! { "postgres": "healthy" }
//! ```
//!
//! Any failing dependency turns the overall status into 500 and its entry
//! into the error message.
//!
//! Every check first waits [`HEALTH_CHECK_DELAY`], unconditionally.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::future::join_all;
use serde::Serialize;
use tracing::{instrument, trace, warn};

/// Fixed delay applied before every health check.
pub const HEALTH_CHECK_DELAY: Duration = Duration::from_millis(50);

/// Default upper bound for a single dependency ping.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Status string reported for a dependency that answered its ping.
pub const HEALTHY: &str = "healthy";

/// Type-erased error returned by a failed ping.
pub type PingError = Box<dyn std::error::Error + Send + Sync>;

/// Anything that can prove it is reachable.
///
/// Callers bound the ping with a timeout and cancel it by dropping the
/// future, so implementations need no deadline handling of their own.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self) -> Result<(), PingError>;
}

/// Outcome of one health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    #[serde(skip)]
    status: StatusCode,
    #[serde(flatten)]
    dependencies: BTreeMap<String, String>,
}

impl HealthReport {
    /// 200 when every dependency is healthy, 500 otherwise.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_success()
    }

    /// Status string of a single dependency.
    pub fn dependency(&self, name: &str) -> Option<&str> {
        self.dependencies.get(name).map(String::as_str)
    }
}

impl IntoResponse for HealthReport {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Pings named dependencies and aggregates the result.
#[derive(Clone)]
pub struct HealthChecker {
    dependencies: Vec<(String, Arc<dyn Pinger>)>,
    timeout: Duration,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new(DEFAULT_PING_TIMEOUT)
    }
}

impl HealthChecker {
    /// Create a checker with no dependencies; each ping is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            dependencies: Vec::new(),
            timeout,
        }
    }

    /// Register a dependency under `name`.
    pub fn with_dependency(mut self, name: impl Into<String>, pinger: Arc<dyn Pinger>) -> Self {
        self.dependencies.push((name.into(), pinger));
        self
    }

    /// Run the check: fixed delay, then every ping concurrently.
    #[instrument(skip(self), fields(dependencies = self.dependencies.len()))]
    pub async fn check(&self) -> HealthReport {
        tokio::time::sleep(HEALTH_CHECK_DELAY).await;

        let results = join_all(self.dependencies.iter().map(|(name, pinger)| async move {
            let outcome = match tokio::time::timeout(self.timeout, pinger.ping()).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("ping timed out after {:?}", self.timeout)),
            };
            (name.clone(), outcome)
        }))
        .await;

        let mut status = StatusCode::OK;
        let mut dependencies = BTreeMap::new();
        for (name, outcome) in results {
            match outcome {
                Ok(()) => {
                    trace!(dependency = %name, "Dependency healthy");
                    dependencies.insert(name, HEALTHY.to_string());
                }
                Err(message) => {
                    warn!(dependency = %name, error = %message, "Dependency unhealthy");
                    status = StatusCode::INTERNAL_SERVER_ERROR;
                    dependencies.insert(name, message);
                }
            }
        }

        HealthReport {
            status,
            dependencies,
        }
    }
}
