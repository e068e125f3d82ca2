use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::instrument;

use crate::error::AppResult;
use crate::models::{CreatePersonRequest, CreatePersonResponse, Person};
use crate::state::AppState;
use crate::validation::parse_person_id;

/// Create a person.
///
/// The body is decoded by hand so that a missing field is reported as
/// `400 {"message": "Missing required field: firstName"}` rather than the
/// extractor's plain-text rejection.
#[instrument(skip(state, body))]
pub async fn create_person(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<CreatePersonResponse>> {
    let request: CreatePersonRequest = serde_json::from_slice(&body)?;
    let person = request.into_new_person()?;

    let id = state.store.create(person).await?;

    Ok(Json(CreatePersonResponse { id }))
}

/// Get a person by id.
#[instrument(skip(state))]
pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Person>> {
    let id = parse_person_id(&id)?;

    let person = state.store.get(id).await?;

    Ok(Json(person))
}

/// Delete a person by id. Answers 200 with an empty body.
#[instrument(skip(state))]
pub async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_person_id(&id)?;

    state.store.delete(id).await?;

    Ok(StatusCode::OK)
}
