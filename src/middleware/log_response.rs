use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

use super::Recorder;

/// Log the final status and wall-clock duration of every request at info level.
pub async fn log_response(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let mut recorder = Recorder::new();
    let response = recorder.run(next, request).await;

    info!(
        status = recorder.status().as_u16(),
        duration = start.elapsed().as_secs_f64(),
        "Served request"
    );
    response
}
