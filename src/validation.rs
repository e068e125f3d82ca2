//! Input validation for person payloads and path identifiers.

use crate::error::{AppError, AppResult};
use crate::models::PersonId;

// =============================================================================
// Validation Constants
// =============================================================================

/// Maximum length for a first or last name, in characters.
pub const MAX_NAME_LENGTH: usize = 255;

/// Validate a required name field (`firstName`, `lastName`).
///
/// Rules:
/// - Must not be empty or whitespace only
/// - Must not exceed 255 characters
/// - Must not contain control characters
pub fn validate_name(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required field: {field}"
        )));
    }

    let length = value.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(AppError::BadRequest(format!(
            "{field} cannot exceed {MAX_NAME_LENGTH} characters (got {length})"
        )));
    }

    if let Some(pos) = value.chars().position(|c| c.is_control()) {
        return Err(AppError::BadRequest(format!(
            "{field} contains invalid control character at position {pos}"
        )));
    }

    Ok(())
}

/// Parse a person identifier taken from the URL path.
///
/// Every stored identifier is an integer, so anything that does not parse as
/// one cannot exist and is reported as not found rather than as a bad request.
pub fn parse_person_id(raw: &str) -> AppResult<PersonId> {
    raw.parse::<PersonId>().map_err(|e| {
        tracing::debug!(id = raw, error = %e, "Non-integer person id");
        AppError::NotFound("not found".to_string())
    })
}
