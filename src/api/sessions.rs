//! Session API endpoints

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, response::Json};
use serde_json::{Map, Value};

/// POST /api/sessions - Create a new chat session
///
/// Responds with `{"sessionId": ...}` or `{"session_id": ...}` depending on
/// configuration.
pub async fn create_session(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let id = state.relay.create_session().await?;

    let mut body = Map::new();
    body.insert(state.session_id_key.as_str().to_string(), Value::String(id));
    Ok(Json(Value::Object(body)))
}
