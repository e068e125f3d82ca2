//! Server lifecycle: serve, shut down with a grace period, release the store.
//!
//! ```text
//! signal ──┐
//!          ├─▶ stop accepting ─▶ drain (≤ grace period) ─▶ cut off requests ─▶ close store
//! failure ─┘
//! ```
//!
//! Whatever ends the server, a shutdown signal or a server failure, the
//! same path runs and the store is closed exactly once on the way out.
//!
//! Requests still running when the grace period ends are dropped and their
//! clients answered with 503, so no handler outlives [`serve`]. The server
//! task is aborted only if connections still fail to close after that.

use std::future::Future;
use std::io;
use std::time::Duration;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::error::ErrorResponse;
use crate::routes::build_router;
use crate::state::AppState;

/// Time cut-off connections get to send their 503 and close.
const CUT_OFF_TIMEOUT: Duration = Duration::from_secs(1);

/// Failure of the HTTP server task.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("server I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] JoinError),
}

/// Serve `state` on `listener` until `shutdown` resolves or the server fails.
///
/// On shutdown the listener stops accepting connections and in-flight
/// requests get `config.shutdown_grace_period` to finish. Requests still
/// running after that are cancelled and answered with 503.
///
/// # Errors
///
/// Returns the server's own failure, if it stopped for one.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send,
{
    let grace_period = state.config.shutdown_grace_period;
    let store = state.store.clone();
    let cut_off = CancellationToken::new();
    let app = build_router(state).layer(from_fn_with_state(cut_off.clone(), cancel_on_cut_off));

    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();

    let stop = cancel.clone();
    let mut server = tracker.spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.cancelled().await })
            .await
    });
    tracker.close();

    let finished = tokio::select! {
        () = shutdown => {
            info!("Shutdown requested, draining in-flight requests");
            None
        }
        joined = &mut server => {
            warn!("HTTP server stopped on its own");
            Some(joined)
        }
    };

    cancel.cancel();

    let joined = match finished {
        Some(joined) => Some(joined),
        None => match tokio::time::timeout(grace_period, &mut server).await {
            Ok(joined) => Some(joined),
            Err(_) => {
                warn!(
                    grace_period = ?grace_period,
                    "Grace period elapsed, cancelling remaining requests"
                );
                cut_off.cancel();
                match tokio::time::timeout(CUT_OFF_TIMEOUT, &mut server).await {
                    Ok(joined) => Some(joined),
                    Err(_) => {
                        warn!("Connections still open, aborting server task");
                        server.abort();
                        None
                    }
                }
            }
        },
    };
    tracker.wait().await;

    store.close().await;

    let result = match joined {
        Some(Ok(Ok(()))) | None => Ok(()),
        Some(Ok(Err(e))) => Err(ServeError::Io(e)),
        Some(Err(e)) => Err(ServeError::Task(e)),
    };

    match &result {
        Ok(()) => info!("Server shutdown complete"),
        Err(e) => error!(error = %e, "Server shutdown after failure"),
    }
    result
}

/// Run the request unless shutdown cuts it off first.
async fn cancel_on_cut_off(
    State(cut_off): State<CancellationToken>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    tokio::select! {
        response = next.run(request) => response,
        () = cut_off.cancelled() => {
            warn!(%method, %uri, "Request cancelled by shutdown");
            let body = ErrorResponse {
                message: "server is shutting down".to_string(),
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

/// Resolve on the first Ctrl+C or SIGTERM.
///
/// A signal whose handler cannot be installed is logged and never fires; the
/// other one still can.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => warn!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => warn!("Received SIGTERM, initiating graceful shutdown"),
    }
}
