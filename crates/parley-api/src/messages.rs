use axum::{Json, extract::State};

use parley_types::models::ChatMessage;

use crate::AppState;
use crate::error::ApiError;

/// Most recent public messages, oldest first. The window size is server
/// configuration; callers can't page or filter.
pub async fn get_messages(State(state): State<AppState>) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    // Run blocking DB query off the async runtime
    let db = state.db.clone();
    let limit = state.history_limit;
    let messages = tokio::task::spawn_blocking(move || db.recent_messages(limit))
        .await?
        .map_err(ApiError::Store)?;

    Ok(Json(messages))
}
