//! Session module
//!
//! Chat session registry: turn model, the `SessionStore` trait, and its
//! in-memory and SQLite implementations.

pub mod db;
pub mod models;
pub mod store;

pub use db::SqliteSessionStore;
pub use models::{generate_session_id, Sender, SessionId, Turn};
pub use store::{InMemorySessionStore, SessionStore};

use crate::config::{SessionConfig, StoreBackend};
use crate::error::AppError;
use std::sync::Arc;

/// Build the session store selected by configuration
pub async fn open_store(config: &SessionConfig) -> Result<Arc<dyn SessionStore>, AppError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemorySessionStore::new())),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteSessionStore::connect(&config.db_url).await?)),
    }
}
