//! Agent module
//!
//! The external agent is reached through the narrow [`Agent`] trait so the
//! relay never depends on how the agent reasons or where it runs.

pub mod adk;
pub mod adk_types;

pub use adk::AdkAgent;

use crate::config::{AgentBackend, AgentConfig};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Context passed along with each message
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// Session the message belongs to
    pub session_id: String,
}

impl AgentContext {
    /// Context for a session
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

/// Errors raised by an agent backend
#[derive(Error, Debug)]
pub enum AgentError {
    /// The request never produced an HTTP response
    #[error("request to agent failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The agent answered with a non-success status
    #[error("agent returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    /// The response body could not be decoded
    #[error("failed to decode agent response: {0}")]
    Decode(String),

    /// The agent produced no reply text
    #[error("agent returned an empty response")]
    EmptyResponse,
}

/// A conversational agent
#[async_trait]
pub trait Agent: Send + Sync {
    /// Display name of the agent
    fn name(&self) -> &str;

    /// Send one user message and return the agent's reply text
    async fn invoke(&self, text: &str, context: &AgentContext) -> Result<String, AgentError>;
}

/// Offline agent that echoes the message back
#[derive(Debug, Clone)]
pub struct EchoAgent {
    name: String,
}

impl EchoAgent {
    /// Create an echo agent with the given display name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Agent for EchoAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, text: &str, _context: &AgentContext) -> Result<String, AgentError> {
        Ok(format!("Echo: {}", text))
    }
}

/// Build the agent selected by configuration
pub fn build_agent(config: &AgentConfig, client: reqwest::Client) -> Arc<dyn Agent> {
    match config.backend {
        AgentBackend::Adk => Arc::new(AdkAgent::new(
            client,
            &config.adk_url,
            &config.adk_app_name,
            &config.adk_user_id,
            &config.name,
        )),
        AgentBackend::Echo => Arc::new(EchoAgent::new(&config.name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_agent() {
        let agent = EchoAgent::new("VentureBot");
        let reply = agent
            .invoke("hi", &AgentContext::for_session("s1"))
            .await
            .unwrap();
        assert_eq!(reply, "Echo: hi");
        assert_eq!(agent.name(), "VentureBot");
    }

    #[test]
    fn test_build_agent_respects_backend() {
        let mut config = crate::config::Config::default().agent;
        config.backend = AgentBackend::Echo;
        config.name = "Echoer".to_string();
        let agent = build_agent(&config, reqwest::Client::new());
        assert_eq!(agent.name(), "Echoer");
    }
}
