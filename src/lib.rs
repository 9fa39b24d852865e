//! AgentLab Gateway Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod relay;
pub mod router;
/// Chat session registry and storage backends
pub mod session;
pub mod state;
pub mod websocket;

use std::sync::Arc;
use std::time::Duration;

/// Wire up store, agent, relay and (optionally) the ADK proxy from configuration
pub async fn build_state(config: &config::Config) -> Result<state::AppState, error::AppError> {
    let store = session::open_store(&config.sessions).await?;
    let agent = agent::build_agent(&config.agent, reqwest::Client::new());
    let relay = relay::ChatRelay::new(
        store,
        agent,
        Duration::from_secs(config.agent.timeout_secs),
    );

    let state = state::AppState::new(Arc::new(relay), config.server.session_id_key);
    if config.server.adk_proxy {
        Ok(state.with_adk_proxy(api::proxy::AdkProxy::new(&config.agent.adk_url)?))
    } else {
        Ok(state)
    }
}
