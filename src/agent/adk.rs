//! ADK api_server client
//!
//! Talks to a running ADK `api_server` over HTTP. Each gateway session maps to
//! an ADK session with the same id, created lazily on the first message.

use super::adk_types::{final_reply, Event, RequestContent, RequestPart, RunRequest};
use super::{Agent, AgentContext, AgentError};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Agent backed by a remote ADK api_server
pub struct AdkAgent {
    client: reqwest::Client,
    base_url: String,
    app_name: String,
    user_id: String,
    name: String,
    /// ADK sessions already created by this process
    known_sessions: RwLock<HashSet<String>>,
}

impl AdkAgent {
    /// Create a client for the ADK server at `base_url`
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client (connection pooling)
    /// * `base_url` - ADK api_server URL, e.g. `http://localhost:8000`
    /// * `app_name` - ADK application (agent directory) name
    /// * `user_id` - ADK user the sessions are created under
    /// * `name` - Display name of the agent
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        app_name: &str,
        user_id: &str,
        name: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            known_sessions: RwLock::new(HashSet::new()),
        }
    }

    /// Make sure the ADK side has a session with this id
    async fn ensure_session(&self, session_id: &str) -> Result<(), AgentError> {
        if self.known_sessions.read().await.contains(session_id) {
            return Ok(());
        }

        let url = format!(
            "{}/apps/{}/users/{}/sessions/{}",
            self.base_url, self.app_name, self.user_id, session_id
        );
        debug!(url = %url, session_id = %session_id, "Creating ADK session");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            // ADK rejects duplicate session ids; the session is usable either way
            if is_duplicate_session(status, &body) {
                debug!(session_id = %session_id, "ADK session already exists");
            } else {
                error!(status_code = status.as_u16(), error_body = %body, "ADK session creation failed");
                return Err(AgentError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
        }

        self.known_sessions
            .write()
            .await
            .insert(session_id.to_string());
        Ok(())
    }

    async fn run(&self, text: &str, session_id: &str) -> Result<String, AgentError> {
        let url = format!("{}/run", self.base_url);
        let request_body = RunRequest {
            app_name: self.app_name.clone(),
            user_id: self.user_id.clone(),
            session_id: session_id.to_string(),
            new_message: RequestContent {
                role: "user".to_string(),
                parts: vec![RequestPart {
                    text: text.to_string(),
                }],
            },
        };

        debug!(
            url = %url,
            session_id = %session_id,
            message_len = text.len(),
            "Calling ADK run"
        );

        let response = self.client.post(&url).json(&request_body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            error!(
                status_code = status.as_u16(),
                error_body = %body,
                "ADK run returned error status"
            );
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response_body = response.text().await?;
        let events: Vec<Event> = serde_json::from_str(&response_body)
            .map_err(|e| AgentError::Decode(format!("{} - Response body: {}", e, response_body)))?;

        let reply = final_reply(&events).ok_or(AgentError::EmptyResponse)?;
        debug!(
            session_id = %session_id,
            events = events.len(),
            response_len = reply.len(),
            "Received ADK reply"
        );
        Ok(reply)
    }
}

/// Whether a failed session create means the session is already there
fn is_duplicate_session(status: StatusCode, body: &str) -> bool {
    match status {
        StatusCode::CONFLICT => true,
        StatusCode::BAD_REQUEST => body.to_ascii_lowercase().contains("already exists"),
        _ => false,
    }
}

#[async_trait]
impl Agent for AdkAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, text: &str, context: &AgentContext) -> Result<String, AgentError> {
        self.ensure_session(&context.session_id).await?;
        self.run(text, &context.session_id).await
    }
}
