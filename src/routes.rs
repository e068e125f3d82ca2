//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← x-request-id generated if absent
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← http_request span (request_id, method, uri)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Propagate ID   │ ← x-request-id copied onto the response
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Body Limit     │
//! └────────┬─────────┘
//!          ▼
//!   Router (per route)
//!          │
//!          ▼
//! ┌──────────────────┐
//! │ Middlewares      │ ← recover → metrics → log response → log request
//! └────────┬─────────┘
//!          ▼
//!      Handler
//! ```
//!
//! The per-route chain is applied with [`Middlewares::wrap`] to every handler
//! individually, after routing, so the metrics middleware sees the matched
//! route template.

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use axum::handler::Handler;
use axum::routing::{get_service, post_service};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info, info_span};

use crate::error::{AppError, AppResult};
use crate::handlers;
use crate::middleware::{Middlewares, REQUEST_ID_HEADER};
use crate::state::AppState;

/// Build the application router with every route wrapped in the standard
/// middleware chain.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_request_body_size;
    let mws = Middlewares::standard(state.metrics.clone(), body_limit);
    info!(chain = %mws, max_body_bytes = body_limit, "Middleware chain configured");

    build_router_with(state, &mws)
}

/// Build the application router with a caller-supplied middleware chain.
///
/// A known path requested with a method it does not serve is answered with
/// 405 through the same chain, so it is logged and counted like any route.
pub fn build_router_with(state: AppState, mws: &Middlewares) -> Router {
    let body_limit = state.config.max_request_body_size;
    let wrong_method = || mws.wrap(method_not_allowed.with_state(()));

    Router::new()
        .route(
            "/person",
            post_service(mws.wrap(handlers::create_person.with_state(state.clone())))
                .fallback_service(wrong_method()),
        )
        .route(
            "/person/{id}",
            get_service(mws.wrap(handlers::get_person.with_state(state.clone())))
                .delete_service(mws.wrap(handlers::delete_person.with_state(state.clone())))
                .fallback_service(wrong_method()),
        )
        .route(
            "/health",
            get_service(mws.wrap(handlers::health_check.with_state(state.clone())))
                .fallback_service(wrong_method()),
        )
        .route(
            "/metrics",
            get_service(mws.wrap(handlers::metrics.with_state(state.clone())))
                .fallback_service(wrong_method()),
        )
        .route(
            "/echo",
            get_service(mws.wrap(handlers::echo.with_state(state))).fallback_service(wrong_method()),
        )
        .fallback_service(mws.wrap(not_found.with_state(())))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

async fn not_found() -> AppResult<()> {
    Err(AppError::NotFound("not found".to_string()))
}

async fn method_not_allowed() -> AppResult<()> {
    Err(AppError::MethodNotAllowed("method not allowed".to_string()))
}

fn request_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    info_span!(
        "http_request",
        request_id,
        method = %request.method(),
        uri = %request.uri(),
    )
}
