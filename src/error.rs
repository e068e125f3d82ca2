use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::middleware::DumpError;
use crate::store::StoreError;

/// Application-wide error types with appropriate HTTP status codes.
///
/// # Client vs Server Errors
///
/// Client errors (`BadRequest`, `NotFound`, `PayloadTooLarge`,
/// `MethodNotAllowed`, `SerializationError`) carry a
/// user-facing message and are logged at debug level only. Everything else
/// is a server error: the full error is logged and the caller receives a
/// generic message.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Database operation failed: {0}")]
    Database(StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("not found".to_string()),
            other => AppError::Database(other),
        }
    }
}

impl From<DumpError> for AppError {
    fn from(err: DumpError) -> Self {
        match err {
            DumpError::TooLarge { limit } => {
                AppError::PayloadTooLarge(format!("Request body exceeds {limit} bytes"))
            }
            DumpError::Body(e) => AppError::Internal(format!("failed to dump request: {e}")),
        }
    }
}

/// Message returned for unexpected server-side failures.
pub(crate) const INTERNAL_ERROR_MESSAGE: &str =
    "An internal error occurred. Please contact support if the issue persists.";

/// Error response body for API endpoints.
#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) message: String,
}

impl AppError {
    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::SerializationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Database(_) | AppError::Internal(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the caller.
    fn public_message(&self) -> String {
        match self {
            // Serde errors can be helpful for clients debugging their payload
            // but sanitize to avoid leaking internal type names
            AppError::SerializationError(e) => sanitize_serde_error(e),
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::MethodNotAllowed(msg) => msg.clone(),

            // Internal errors - never expose internal details to clients
            AppError::Database(_) => {
                "Database operation failed. Please try again later.".to_string()
            }
            AppError::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            AppError::ConfigError(_) => {
                "Service configuration error. Please contact support.".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log the full error details server-side for debugging
        // but only expose sanitized messages to clients
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorResponse {
            message: self.public_message(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Sanitize serde error messages to avoid leaking internal type information.
///
/// Serde errors can contain internal struct/field names which shouldn't be
/// exposed to external clients. This function extracts the useful parts.
fn sanitize_serde_error(e: &serde_json::Error) -> String {
    let msg = e.to_string();

    // Common patterns to simplify for users
    if msg.contains("missing field")
        && let Some(start) = msg.find('`')
        && let Some(end) = msg[start + 1..].find('`')
    {
        let field = &msg[start + 1..start + 1 + end];
        return format!("Missing required field: {field}");
    }

    if msg.contains("invalid type") {
        return "Invalid data type in request body".to_string();
    }

    if msg.contains("EOF while parsing") || msg.contains("expected") {
        return "Malformed JSON in request body".to_string();
    }

    // Generic fallback that doesn't leak internal details
    "Invalid request format".to_string()
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
