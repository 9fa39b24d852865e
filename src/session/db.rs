//! SQLite-backed session store
//!
//! Persists sessions and turns so history survives restarts.

use super::models::{generate_session_id, Sender, SessionId, Turn};
use super::store::SessionStore;
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Database connection pool for session operations
pub struct SqliteSessionStore {
    pool: SqlitePool,
}

impl SqliteSessionStore {
    /// Open (or create) the database and run migrations
    ///
    /// # Arguments
    /// * `db_url` - `sqlite:` URL or plain path to the database file
    ///
    /// # Returns
    /// * `Ok(SqliteSessionStore)` if successful
    /// * `Err(AppError)` if connection or migration failed
    pub async fn connect(db_url: &str) -> Result<Self, AppError> {
        let connection_string = if db_url.starts_with("sqlite:") {
            db_url.to_string()
        } else {
            format!("sqlite:{}", db_url)
        };

        if let Some(parent) = db_file_path(&connection_string).and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Failed to create db directory: {}", e))
                })?;
            }
        }

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| AppError::InvalidInput(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!(db_url = %db_url, "Connected to session database");

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), AppError> {
        let migration_sql = include_str!("../../migrations/001_create_sessions.sql");

        for statement in split_statements(migration_sql) {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::Internal(anyhow::anyhow!(
                        "Migration failed: {} - Statement: {}",
                        e,
                        statement.chars().take(100).collect::<String>()
                    ))
                })?;
        }

        debug!("Session database migrations applied");
        Ok(())
    }
}

/// Filesystem path of a `sqlite:` URL, if it names a file
fn db_file_path(connection_string: &str) -> Option<&Path> {
    let rest = connection_string
        .strip_prefix("sqlite://")
        .or_else(|| connection_string.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

/// Strip `--` comments and split a migration script into statements
fn split_statements(sql: &str) -> Vec<String> {
    let cleaned: String = sql
        .lines()
        .map(|line| match line.find("--") {
            Some(pos) => &line[..pos],
            None => line,
        })
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    cleaned
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create(&self) -> Result<SessionId, AppError> {
        let id = generate_session_id();
        sqlx::query("INSERT INTO sessions (id, created_at) VALUES (?, ?)")
            .bind(&id)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;

        debug!(session_id = %id, "Created session");
        Ok(id)
    }

    async fn exists(&self, id: &str) -> Result<bool, AppError> {
        let found: Option<String> = sqlx::query_scalar("SELECT id FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn append(&self, id: &str, turns: Vec<Turn>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let found: Option<String> = sqlx::query_scalar("SELECT id FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            return Err(AppError::SessionNotFound(id.to_string()));
        }

        let now = chrono::Utc::now().timestamp();
        for turn in &turns {
            sqlx::query(
                "INSERT INTO turns (session_id, sender, text, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(turn.sender.as_str())
            .bind(&turn.text)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(session_id = %id, added = turns.len(), "Appended turns");
        Ok(())
    }

    async fn history(&self, id: &str) -> Result<Vec<Turn>, AppError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT sender, text FROM turns WHERE session_id = ? ORDER BY seq ASC")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        let turns = rows
            .into_iter()
            .filter_map(|(sender, text)| match sender.parse::<Sender>() {
                Ok(sender) => Some(Turn { sender, text }),
                Err(e) => {
                    warn!(session_id = %id, error = %e, "Skipping turn with unknown sender");
                    None
                }
            })
            .collect();

        Ok(turns)
    }

    async fn count(&self) -> Result<usize, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
