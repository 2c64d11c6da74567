//! Session state and persistence
//!
//! The guard/loop/ledger pipeline treats storage as an opaque keyed
//! contract: `load(session_id)` / `save(state)`. Two backends are
//! provided — in-memory for development and tests, Postgres for
//! deployments — selected at startup from the environment.

use crate::error::CoachingError;
use crate::models::{ChatMessage, ChatRole};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// How many recent messages reach the model each turn.
pub const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: Uuid,
    pub customer_id: String,
    pub messages: Vec<ChatMessage>,
    pub conversation_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(customer_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            customer_id: customer_id.into(),
            messages: Vec::new(),
            conversation_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
        });
        self.updated_at = Utc::now();
    }

    /// The last-N message window sent to the model.
    pub fn window(&self) -> Vec<ChatMessage> {
        let start = self.messages.len().saturating_sub(HISTORY_WINDOW);
        self.messages[start..].to_vec()
    }
}

/// Opaque session persistence contract.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: Uuid) -> Result<Option<SessionState>>;
    async fn save(&self, state: &SessionState) -> Result<()>;
}

//
// ================= In-memory backend =================
//

pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionState>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<SessionState>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&session_id).cloned())
    }

    async fn save(&self, state: &SessionState) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(state.session_id, state.clone());
        Ok(())
    }
}

//
// ================= Postgres backend =================
//

pub struct PostgresSessionStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS coaching_sessions (
                      session_id UUID PRIMARY KEY,
                      customer_id TEXT NOT NULL,
                      state TEXT NOT NULL,
                      created_at TIMESTAMPTZ NOT NULL,
                      updated_at TIMESTAMPTZ NOT NULL
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                CoachingError::DatabaseError(format!("Failed to initialize session schema: {}", e))
            })?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionStore for PostgresSessionStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<SessionState>> {
        self.ensure_schema().await?;

        let row = sqlx::query("SELECT state FROM coaching_sessions WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                CoachingError::DatabaseError(format!("Failed to load session: {}", e))
            })?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("state").map_err(|e| {
                    CoachingError::DatabaseError(format!("Malformed session row: {}", e))
                })?;
                let state = serde_json::from_str(&raw)?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, state: &SessionState) -> Result<()> {
        self.ensure_schema().await?;

        let raw = serde_json::to_string(state)?;
        sqlx::query(
            r#"
            INSERT INTO coaching_sessions (session_id, customer_id, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (session_id)
            DO UPDATE SET state = $3, updated_at = $5
            "#,
        )
        .bind(state.session_id)
        .bind(&state.customer_id)
        .bind(raw)
        .bind(state.created_at)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CoachingError::DatabaseError(format!("Failed to save session: {}", e)))?;

        Ok(())
    }
}

/// Select a backend at startup: Postgres when DATABASE_URL is configured
/// and reachable, in-memory otherwise.
pub fn build_store() -> Arc<dyn SessionStore> {
    let database_url = env::var("DATABASE_URL").or_else(|_| env::var("POSTGRES_URL")).ok();

    if let Some(url) = database_url {
        match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(&url)
        {
            Ok(pool) => {
                info!("Session store backend: postgres");
                return Arc::new(PostgresSessionStore::new(pool));
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres session store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Session store backend: in-memory");
    Arc::new(InMemorySessionStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemorySessionStore::new();
        let mut state = SessionState::new("CUST_001");
        state.push(ChatRole::User, "hello");

        store.save(&state).await.unwrap();
        let loaded = store.load(state.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.customer_id, "CUST_001");
        assert_eq!(loaded.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_session_is_none() {
        let store = InMemorySessionStore::new();
        assert!(store.load(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[test]
    fn test_window_keeps_last_ten() {
        let mut state = SessionState::new("CUST_001");
        for i in 0..25 {
            state.push(ChatRole::User, format!("message {}", i));
        }
        let window = state.window();
        assert_eq!(window.len(), HISTORY_WINDOW);
        assert_eq!(window.last().map(|m| m.content.as_str()), Some("message 24"));
    }

    #[test]
    fn test_state_serializes() {
        let mut state = SessionState::new("CUST_001");
        state.push(ChatRole::Assistant, "hi");
        let raw = serde_json::to_string(&state).unwrap();
        let back: SessionState = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.messages[0].role, ChatRole::Assistant);
    }
}
