use axum::extract::{Request, State};

use crate::error::AppResult;
use crate::middleware::dump_request;
use crate::state::AppState;

/// Answer with a `text/plain` dump of the request as it was received.
///
/// A body over the configured limit is answered with 413.
pub async fn echo(State(state): State<AppState>, request: Request) -> AppResult<String> {
    let (dump, _) = dump_request(request, state.config.max_request_body_size).await?;

    Ok(dump)
}
