//! WebSocket handlers for real-time updates
//!
//! Streams relay events for one session to a connected client. Supports
//! ping/pong for connection keepalive.

use crate::relay::{AgentStatus, SessionEvent};
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Messages a client may send
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ping message for connection keepalive
    Ping,
    /// Pong message responding to ping
    Pong,
}

/// WebSocket upgrade handler
///
/// Sends the session's current status, then every relay event for that
/// session until the client disconnects.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, state))
}

async fn handle_socket(socket: WebSocket, session_id: String, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.relay.subscribe();

    info!(session_id = %session_id, "WebSocket client connected");

    let status = state
        .relay
        .status(&session_id)
        .await
        .unwrap_or(AgentStatus::Error);
    let initial = SessionEvent::AgentStatus {
        session_id: session_id.clone(),
        status,
        agent: state.relay.agent_name().to_string(),
    };
    match serde_json::to_string(&initial) {
        Ok(text) => {
            if let Err(e) = sender.send(Message::Text(text)).await {
                error!("Failed to send initial status: {}", e);
                return;
            }
        }
        Err(e) => {
            error!("Failed to serialize initial status: {}", e);
            return;
        }
    }

    // Use a channel to send messages from the other tasks to the sink
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                error!("Failed to send message: {}", e);
                break;
            }
        }
    });

    let event_tx = tx.clone();
    let event_session = session_id.clone();
    let mut event_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event.session_id() == event_session => {
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if event_tx.send(Message::Text(text)).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(session_id = %event_session, skipped, "WebSocket client lagging");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let ping_tx = tx.clone();
    let mut ping_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;
            if ping_tx.send(Message::Ping(vec![])).is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Ping) => {
                        if let Ok(pong) = serde_json::to_string(&ClientMessage::Pong) {
                            if tx.send(Message::Text(pong)).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(ClientMessage::Pong) => {}
                    Err(_) => debug!("Ignoring unrecognized WebSocket message"),
                },
                Ok(Message::Close(_)) => {
                    info!("WebSocket client disconnected");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for any task to complete
    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut event_task => {}
        _ = &mut ping_task => {}
        _ = &mut recv_task => {}
    }
    send_task.abort();
    event_task.abort();
    ping_task.abort();
    recv_task.abort();

    info!(session_id = %session_id, "WebSocket connection closed");
}
