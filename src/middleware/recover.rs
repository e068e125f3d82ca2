//! Panic containment.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::Json;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use tracing::error;

use super::REQUEST_ID_HEADER;
use crate::error::{ErrorResponse, INTERNAL_ERROR_MESSAGE};

/// Run the rest of the chain, converting a panic into a 500 response.
///
/// One error entry is logged per recovered panic, tagged with the request id
/// when present. Responses from handlers that did not panic pass through
/// untouched.
pub async fn recover(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            error!(
                %method,
                %uri,
                request_id = request_id.as_deref().unwrap_or_default(),
                panic = panic_message(panic.as_ref()),
                "Recovered from handler panic"
            );

            let body = ErrorResponse {
                message: INTERNAL_ERROR_MESSAGE.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic type")
}
