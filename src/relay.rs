//! Chat relay
//!
//! Forwards user messages to the agent and records each exchange. Exchanges on
//! the same session are serialized; different sessions proceed concurrently.

use crate::agent::{Agent, AgentContext};
use crate::error::AppError;
use crate::session::{SessionId, SessionStore, Turn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Maximum message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

/// Capacity of the event channel before slow subscribers start lagging
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Agent status as seen by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Session exists and no exchange is in flight
    Active,
    /// An exchange is in flight
    Busy,
    /// The most recent exchange on the session failed or timed out
    Error,
    /// No such session
    Inactive,
}

/// Events published while relaying messages
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Agent status changed for a session
    AgentStatus {
        /// Session the status applies to
        session_id: SessionId,
        /// New status
        status: AgentStatus,
        /// Agent display name
        agent: String,
    },
    /// The agent replied
    AgentResponse {
        /// Session the reply belongs to
        session_id: SessionId,
        /// Always `agent`
        sender: crate::session::Sender,
        /// Reply text
        text: String,
    },
}

impl SessionEvent {
    /// Session this event belongs to
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::AgentStatus { session_id, .. } => session_id,
            SessionEvent::AgentResponse { session_id, .. } => session_id,
        }
    }
}

/// Relays chat messages between sessions and the agent
pub struct ChatRelay {
    store: Arc<dyn SessionStore>,
    agent: Arc<dyn Agent>,
    timeout: Duration,
    /// Per-session exchange locks
    locks: RwLock<HashMap<SessionId, Arc<Mutex<()>>>>,
    /// Sessions whose most recent exchange failed
    failed: RwLock<HashSet<SessionId>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatRelay {
    /// Create a relay over a store and an agent
    pub fn new(store: Arc<dyn SessionStore>, agent: Arc<dyn Agent>, timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            agent,
            timeout,
            locks: RwLock::new(HashMap::new()),
            failed: RwLock::new(HashSet::new()),
            events,
        }
    }

    /// Display name of the agent
    pub fn agent_name(&self) -> &str {
        self.agent.name()
    }

    /// The underlying session store
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Subscribe to relay events for all sessions
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Create a new empty session
    pub async fn create_session(&self) -> Result<SessionId, AppError> {
        let id = self.store.create().await?;
        info!(session_id = %id, "Session created");
        Ok(id)
    }

    /// History of a session; empty for unknown ids
    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>, AppError> {
        self.store.history(session_id).await
    }

    /// Current agent status for a session
    pub async fn status(&self, session_id: &str) -> Result<AgentStatus, AppError> {
        if !self.store.exists(session_id).await? {
            return Ok(AgentStatus::Inactive);
        }

        let busy = {
            let locks = self.locks.read().await;
            locks
                .get(session_id)
                .map(|lock| lock.try_lock().is_err())
                .unwrap_or(false)
        };

        Ok(if busy {
            AgentStatus::Busy
        } else if self.failed.read().await.contains(session_id) {
            AgentStatus::Error
        } else {
            AgentStatus::Active
        })
    }

    /// Send a user message to the agent and record the exchange
    ///
    /// # Returns
    /// * `Ok(String)` - The agent's reply
    ///
    /// # Errors
    /// * `AppError::InvalidInput` - empty or oversized message
    /// * `AppError::SessionNotFound` - the session was never created
    /// * `AppError::AgentInvocationFailed` / `AppError::AgentTimeout` - the agent call failed;
    ///   nothing is recorded in that case
    pub async fn send(&self, session_id: &str, text: &str) -> Result<String, AppError> {
        validate_message(text)?;

        if !self.store.exists(session_id).await? {
            return Err(AppError::SessionNotFound(session_id.to_string()));
        }

        let lock = self.lock_for(session_id).await;
        let _guard = lock.lock().await;

        self.publish_status(session_id, AgentStatus::Busy);
        debug!(session_id = %session_id, message_len = text.len(), "Invoking agent");

        let context = AgentContext::for_session(session_id);
        let reply = match tokio::time::timeout(self.timeout, self.agent.invoke(text, &context))
            .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                error!(session_id = %session_id, error = %e, "Agent invocation failed");
                self.mark_failed(session_id, true).await;
                self.publish_status(session_id, AgentStatus::Error);
                return Err(AppError::from(e));
            }
            Err(_) => {
                error!(
                    session_id = %session_id,
                    timeout_secs = self.timeout.as_secs(),
                    "Agent invocation timed out"
                );
                self.mark_failed(session_id, true).await;
                self.publish_status(session_id, AgentStatus::Error);
                return Err(AppError::AgentTimeout(self.timeout.as_secs()));
            }
        };

        self.store
            .append(session_id, vec![Turn::user(text), Turn::agent(reply.clone())])
            .await?;
        self.mark_failed(session_id, false).await;

        info!(
            session_id = %session_id,
            response_len = reply.len(),
            "Exchange recorded"
        );

        self.publish(SessionEvent::AgentResponse {
            session_id: session_id.to_string(),
            sender: crate::session::Sender::Agent,
            text: reply.clone(),
        });
        self.publish_status(session_id, AgentStatus::Active);

        Ok(reply)
    }

    /// Get or create the exchange lock for a session
    async fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(session_id) {
                return lock.clone();
            }
        }

        let mut locks = self.locks.write().await;
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn mark_failed(&self, session_id: &str, failed: bool) {
        let mut set = self.failed.write().await;
        if failed {
            set.insert(session_id.to_string());
        } else {
            set.remove(session_id);
        }
    }

    fn publish_status(&self, session_id: &str, status: AgentStatus) {
        self.publish(SessionEvent::AgentStatus {
            session_id: session_id.to_string(),
            status,
            agent: self.agent.name().to_string(),
        });
    }

    fn publish(&self, event: SessionEvent) {
        // Err only means nobody is listening
        if self.events.send(event).is_err() {
            debug!("No event subscribers");
        }
    }
}

/// Validate a chat message
///
/// # Errors
/// * `AppError::InvalidInput` if the message is empty or too long
pub fn validate_message(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput("Message text cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        warn!(message_len = text.len(), "Rejected oversized message");
        return Err(AppError::InvalidInput(format!(
            "Message exceeds maximum length of {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentError, EchoAgent};
    use crate::session::{InMemorySessionStore, Sender};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingAgent;

    #[async_trait]
    impl Agent for FailingAgent {
        fn name(&self) -> &str {
            "Failing"
        }

        async fn invoke(&self, _text: &str, _context: &AgentContext) -> Result<String, AgentError> {
            Err(AgentError::EmptyResponse)
        }
    }

    /// Sleeps, then replies with the number of calls it had seen when it started
    struct SlowAgent {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Agent for SlowAgent {
        fn name(&self) -> &str {
            "Slow"
        }

        async fn invoke(&self, text: &str, _context: &AgentContext) -> Result<String, AgentError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(format!("{}:{}", n, text))
        }
    }

    fn relay_with(agent: Arc<dyn Agent>, timeout: Duration) -> ChatRelay {
        ChatRelay::new(Arc::new(InMemorySessionStore::new()), agent, timeout)
    }

    fn echo_relay() -> ChatRelay {
        relay_with(Arc::new(EchoAgent::new("VentureBot")), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_send_records_exchange() {
        let relay = echo_relay();
        let id = relay.create_session().await.unwrap();

        let reply = relay.send(&id, "hi").await.unwrap();
        assert_eq!(reply, "Echo: hi");

        let history = relay.history(&id).await.unwrap();
        assert_eq!(history, vec![Turn::user("hi"), Turn::agent("Echo: hi")]);
    }

    #[tokio::test]
    async fn test_send_unknown_session() {
        let relay = echo_relay();
        let result = relay.send("missing", "hi").await;
        assert!(matches!(result, Err(AppError::SessionNotFound(_))));
        assert!(relay.history("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_rejects_empty_message() {
        let relay = echo_relay();
        let id = relay.create_session().await.unwrap();
        let result = relay.send(&id, "   ").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(relay.history(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_rejects_oversized_message() {
        let relay = echo_relay();
        let id = relay.create_session().await.unwrap();
        let text = "a".repeat(MAX_MESSAGE_LENGTH + 1);
        assert!(matches!(
            relay.send(&id, &text).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_agent_failure_records_nothing() {
        let relay = relay_with(Arc::new(FailingAgent), Duration::from_secs(5));
        let id = relay.create_session().await.unwrap();

        let result = relay.send(&id, "hi").await;
        assert!(matches!(result, Err(AppError::AgentInvocationFailed(_))));
        assert!(relay.history(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_agent_timeout() {
        let agent = SlowAgent {
            delay: Duration::from_millis(500),
            calls: AtomicUsize::new(0),
        };
        let relay = relay_with(Arc::new(agent), Duration::from_millis(20));
        let id = relay.create_session().await.unwrap();

        let result = relay.send(&id, "hi").await;
        assert!(matches!(result, Err(AppError::AgentTimeout(_))));
        assert!(relay.history(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_exchanges_stay_paired() {
        let agent = SlowAgent {
            delay: Duration::from_millis(10),
            calls: AtomicUsize::new(0),
        };
        let relay = Arc::new(relay_with(Arc::new(agent), Duration::from_secs(5)));
        let id = relay.create_session().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..5 {
            let relay = relay.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                relay.send(&id, &format!("m{}", i)).await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let history = relay.history(&id).await.unwrap();
        assert_eq!(history.len(), 10);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].sender, Sender::User);
            assert_eq!(pair[1].sender, Sender::Agent);
            assert!(pair[1].text.ends_with(&pair[0].text));
        }
    }

    #[tokio::test]
    async fn test_status() {
        let agent = Arc::new(SlowAgent {
            delay: Duration::from_millis(200),
            calls: AtomicUsize::new(0),
        });
        let relay = Arc::new(relay_with(agent, Duration::from_secs(5)));
        assert_eq!(relay.status("missing").await.unwrap(), AgentStatus::Inactive);

        let id = relay.create_session().await.unwrap();
        assert_eq!(relay.status(&id).await.unwrap(), AgentStatus::Active);

        let in_flight = {
            let relay = relay.clone();
            let id = id.clone();
            tokio::spawn(async move { relay.send(&id, "hi").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(relay.status(&id).await.unwrap(), AgentStatus::Busy);

        in_flight.await.unwrap().unwrap();
        assert_eq!(relay.status(&id).await.unwrap(), AgentStatus::Active);
    }

    /// Fails on messages starting with "fail", echoes otherwise
    struct FlakyAgent;

    #[async_trait]
    impl Agent for FlakyAgent {
        fn name(&self) -> &str {
            "Flaky"
        }

        async fn invoke(&self, text: &str, _context: &AgentContext) -> Result<String, AgentError> {
            if text.starts_with("fail") {
                Err(AgentError::EmptyResponse)
            } else {
                Ok(text.to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_status_reports_last_failure() {
        let relay = relay_with(Arc::new(FlakyAgent), Duration::from_secs(5));
        let id = relay.create_session().await.unwrap();
        let other = relay.create_session().await.unwrap();

        assert!(relay.send(&id, "fail now").await.is_err());
        assert_eq!(relay.status(&id).await.unwrap(), AgentStatus::Error);
        assert_eq!(relay.status(&other).await.unwrap(), AgentStatus::Active);

        relay.send(&id, "ok").await.unwrap();
        assert_eq!(relay.status(&id).await.unwrap(), AgentStatus::Active);
    }

    #[tokio::test]
    async fn test_events_published() {
        let relay = echo_relay();
        let id = relay.create_session().await.unwrap();
        let mut rx = relay.subscribe();

        relay.send(&id, "hi").await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            SessionEvent::AgentStatus { status: AgentStatus::Busy, .. }
        ));
        assert_eq!(
            events[1],
            SessionEvent::AgentResponse {
                session_id: id.clone(),
                sender: Sender::Agent,
                text: "Echo: hi".to_string(),
            }
        );
        assert!(matches!(
            events[2],
            SessionEvent::AgentStatus { status: AgentStatus::Active, .. }
        ));
        assert!(events.iter().all(|e| e.session_id() == id));
    }

    #[test]
    fn test_event_wire_format() {
        let event = SessionEvent::AgentStatus {
            session_id: "s1".to_string(),
            status: AgentStatus::Busy,
            agent: "VentureBot".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "agent_status");
        assert_eq!(json["status"], "busy");
    }
}
