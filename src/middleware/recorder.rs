//! Observation of the status a handler produced.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

/// Records the status code of the response flowing back through a middleware.
///
/// The first recorded status wins; later writes are ignored. A recorder that
/// never saw a status reports `200 OK`, which is what a handler that writes a
/// body without an explicit status produces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Recorder {
    status: Option<StatusCode>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `status` unless one was already recorded. Returns whether it was.
    pub fn write_status(&mut self, status: StatusCode) -> bool {
        if self.status.is_some() {
            return false;
        }
        self.status = Some(status);
        true
    }

    /// The recorded status, or `200 OK` if nothing was written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn is_written(&self) -> bool {
        self.status.is_some()
    }

    /// Observe `response` and hand it back unchanged.
    pub fn observe(&mut self, response: Response) -> Response {
        self.write_status(response.status());
        response
    }

    /// Run the rest of the chain and record the status it answered with.
    pub async fn run(&mut self, next: Next, request: Request) -> Response {
        let response = next.run(request).await;
        self.observe(response)
    }
}
