//! Status and health endpoints

use crate::error::AppError;
use crate::relay::AgentStatus;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

/// Agent status for a session
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// `active`, `busy` or `inactive`
    pub status: AgentStatus,
    /// Agent display name
    pub agent: String,
}

/// Greeting returned from `/`
#[derive(Serialize)]
pub struct HelloResponse {
    /// Greeting text
    pub message: String,
    /// Always `ok`
    pub status: String,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `healthy` when the store answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Number of stored sessions
    pub sessions: usize,
}

/// GET /api/status/:session_id - Current agent status for a session
pub async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let status = state.relay.status(&session_id).await?;
    Ok(Json(StatusResponse {
        status,
        agent: state.relay.agent_name().to_string(),
    }))
}

/// GET /
pub async fn hello_world() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from AgentLab Gateway!".to_string(),
        status: "ok".to_string(),
    })
}

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let sessions = state.relay.store().count().await?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sessions,
    }))
}
