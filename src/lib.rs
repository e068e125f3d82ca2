//! # Bungalow
//!
//! A small person service over PostgreSQL whose interesting part is the
//! request lifecycle around the handlers:
//!
//! - **Middleware composition**: ordered handler-to-handler wrappers
//! - **Panic containment**: a panicking handler yields 500, the server keeps serving
//! - **Instrumentation**: in-flight gauge, per-status counters and durations
//!   keyed by route template
//! - **Health**: concurrent, timeout-bounded dependency pings
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Router layers (Request ID → Trace → Body Limit)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middlewares (Recover → Metrics → Log Response → Log Req)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (person, health, metrics, echo)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PersonStore (PgStore | MemoryStore)                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bungalow::{AppState, Config, PgStore, server};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = Arc::new(PgStore::connect(&config).await?);
//!     let listener = TcpListener::bind(config.server_addr()).await?;
//!
//!     let state = AppState::new(store, config);
//!     server::serve(listener, state, server::shutdown_signal()).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use self::metrics::HttpMetrics;
pub use middleware::{Middleware, Middlewares};
pub use routes::build_router;
pub use state::AppState;
pub use store::{MemoryStore, PersonStore, PgStore};
