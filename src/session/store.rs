//! Session store abstraction and the in-memory implementation
//!
//! The in-memory store keeps every session for the lifetime of the process.
//! There is no capacity bound and no eviction, and contents are lost on restart.

use super::models::{generate_session_id, SessionId, Turn};
use crate::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Storage backend for chat sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new session with an empty history and return its ID
    async fn create(&self) -> Result<SessionId, AppError>;

    /// Whether a session with this ID exists
    async fn exists(&self, id: &str) -> Result<bool, AppError>;

    /// Append turns to a session, all or nothing
    ///
    /// # Errors
    /// * `AppError::SessionNotFound` if the session was never created
    async fn append(&self, id: &str, turns: Vec<Turn>) -> Result<(), AppError>;

    /// Full history of a session, oldest first
    ///
    /// Unknown IDs yield an empty history rather than an error.
    async fn history(&self, id: &str) -> Result<Vec<Turn>, AppError>;

    /// Number of sessions currently stored
    async fn count(&self) -> Result<usize, AppError>;
}

/// Volatile, process-local session store
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Vec<Turn>>>,
}

impl InMemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self) -> Result<SessionId, AppError> {
        let mut sessions = self.sessions.write().await;
        let mut id = generate_session_id();
        while sessions.contains_key(&id) {
            id = generate_session_id();
        }
        sessions.insert(id.clone(), Vec::new());
        debug!(session_id = %id, "Created session");
        Ok(id)
    }

    async fn exists(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.sessions.read().await.contains_key(id))
    }

    async fn append(&self, id: &str, turns: Vec<Turn>) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        let history = sessions
            .get_mut(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;
        debug!(session_id = %id, added = turns.len(), "Appending turns");
        history.extend(turns);
        Ok(())
    }

    async fn history(&self, id: &str) -> Result<Vec<Turn>, AppError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.sessions.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::Sender;

    #[tokio::test]
    async fn test_create_yields_distinct_ids() {
        let store = InMemorySessionStore::new();
        let a = store.create().await.unwrap();
        let b = store.create().await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_new_session_has_empty_history() {
        let store = InMemorySessionStore::new();
        let id = store.create().await.unwrap();
        assert!(store.exists(&id).await.unwrap());
        assert!(store.history(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session_history_is_empty() {
        let store = InMemorySessionStore::new();
        assert!(store.history("nope").await.unwrap().is_empty());
        assert!(!store.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = InMemorySessionStore::new();
        let id = store.create().await.unwrap();
        store
            .append(&id, vec![Turn::user("hi"), Turn::agent("hello")])
            .await
            .unwrap();
        store
            .append(&id, vec![Turn::user("again"), Turn::agent("sure")])
            .await
            .unwrap();

        let history = store.history(&id).await.unwrap();
        let texts: Vec<&str> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "hello", "again", "sure"]);
        assert_eq!(history[0].sender, Sender::User);
        assert_eq!(history[1].sender, Sender::Agent);
    }

    #[tokio::test]
    async fn test_append_to_unknown_session_fails() {
        let store = InMemorySessionStore::new();
        let result = store.append("missing", vec![Turn::user("hi")]).await;
        match result {
            Err(AppError::SessionNotFound(id)) => assert_eq!(id, "missing"),
            other => panic!("Expected SessionNotFound, got {:?}", other),
        }
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
