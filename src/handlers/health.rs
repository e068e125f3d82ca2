//! `GET /health`.
//!
//! ```json
//! { "postgres": "healthy" }
//! ```
//!
//! Answers 200 when every dependency responds to a ping and 500 otherwise;
//! failed dependencies carry their error text instead of `"healthy"`.

use axum::extract::State;
use tracing::instrument;

use crate::health::HealthReport;
use crate::state::AppState;

#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> HealthReport {
    state.health.check().await
}
