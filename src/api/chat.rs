//! Chat API endpoints
//!
//! Handles HTTP requests for sending messages and reading history.

use crate::error::AppError;
use crate::session::Turn;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

/// Request to send a message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Message text (`message` is accepted as an alias)
    #[serde(alias = "message")]
    pub text: String,
}

/// Agent reply
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// Reply text from the agent
    pub response: String,
}

/// POST /api/chat/:session_id - Relay a message to the agent
pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let response = state.relay.send(&session_id, &request.text).await?;
    Ok(Json(SendMessageResponse { response }))
}

/// GET /api/chat/:session_id - Chat history, empty for unknown sessions
pub async fn get_chat_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<Turn>>, AppError> {
    let history = state.relay.history(&session_id).await?;
    Ok(Json(history))
}
