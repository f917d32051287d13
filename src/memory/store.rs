//! Conversation turn storage
//!
//! Two backends behind one trait: PostgreSQL for deployments and an
//! in-process map for development and tests. Both keep turns in the exact
//! order they were appended.

use crate::error::AdvisorError;
use crate::models::{ConversationTurn, Role, Session};
use crate::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Trait for turn persistence
#[async_trait::async_trait]
pub trait MemoryStore: Send + Sync {
    /// Register a session; a no-op when it already exists.
    async fn ensure_session(&self, session: &Session) -> Result<()>;

    /// Append turns atomically, in order.
    async fn append(&self, turns: &[ConversationTurn]) -> Result<()>;

    /// Turns in append order. With a limit, only the most recent `limit`.
    async fn history(&self, session_id: Uuid, limit: Option<usize>)
        -> Result<Vec<ConversationTurn>>;

    async fn turn_count(&self, session_id: Uuid) -> Result<usize>;

    /// Remove every turn of the session and return how many were removed.
    async fn clear(&self, session_id: Uuid) -> Result<u64>;

    fn backend_name(&self) -> &'static str;
}

fn tail(turns: &[ConversationTurn], limit: Option<usize>) -> Vec<ConversationTurn> {
    let start = match limit {
        Some(limit) => turns.len().saturating_sub(limit),
        None => 0,
    };
    turns[start..].to_vec()
}

// =============================
// In-memory backend
// =============================

/// In-memory store for development
pub struct InMemoryMemoryStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    turns: Arc<RwLock<HashMap<Uuid, Vec<ConversationTurn>>>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            turns: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn session(&self, session_id: Uuid) -> Option<Session> {
        self.sessions.read().await.get(&session_id).cloned()
    }
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn ensure_session(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session.session_id)
            .or_insert_with(|| session.clone());
        Ok(())
    }

    async fn append(&self, turns: &[ConversationTurn]) -> Result<()> {
        let mut locked = self.turns.write().await;
        for turn in turns {
            locked
                .entry(turn.session_id)
                .or_insert_with(Vec::new)
                .push(turn.clone());
        }
        Ok(())
    }

    async fn history(
        &self,
        session_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationTurn>> {
        let locked = self.turns.read().await;
        Ok(locked
            .get(&session_id)
            .map(|turns| tail(turns, limit))
            .unwrap_or_default())
    }

    async fn turn_count(&self, session_id: Uuid) -> Result<usize> {
        let locked = self.turns.read().await;
        Ok(locked.get(&session_id).map(Vec::len).unwrap_or(0))
    }

    async fn clear(&self, session_id: Uuid) -> Result<u64> {
        let mut locked = self.turns.write().await;
        Ok(locked
            .remove(&session_id)
            .map(|turns| turns.len() as u64)
            .unwrap_or(0))
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

// =============================
// PostgreSQL backend
// =============================

/// Postgres-backed store; embeddings live in a `REAL[]` column.
pub struct PostgresMemoryStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresMemoryStore {
    /// Create a lazily connecting pool; nothing touches the network until
    /// the first query.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)
            .map_err(|e| {
                AdvisorError::DatabaseError(format!("Invalid database URL: {}", e))
            })?;

        info!("Conversation memory backend: postgres");

        Ok(Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS advisor_sessions (
                      session_id UUID PRIMARY KEY,
                      label TEXT NOT NULL,
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS conversation_turns (
                      seq BIGSERIAL PRIMARY KEY,
                      turn_id UUID NOT NULL UNIQUE,
                      session_id UUID NOT NULL
                          REFERENCES advisor_sessions (session_id) ON DELETE CASCADE,
                      role TEXT NOT NULL,
                      text TEXT NOT NULL,
                      embedding REAL[],
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_conversation_turns_session_seq
                    ON conversation_turns (session_id, seq);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                AdvisorError::DatabaseError(format!(
                    "Failed to initialize conversation memory schema: {}",
                    e
                ))
            })?;

        Ok(())
    }

    fn turn_from_row(row: &sqlx::postgres::PgRow) -> Result<ConversationTurn> {
        let role: String = row.try_get("role")?;
        Ok(ConversationTurn {
            turn_id: row.try_get("turn_id")?,
            session_id: row.try_get("session_id")?,
            role: Role::from_db(&role),
            text: row.try_get("text")?,
            timestamp: row.try_get("created_at")?,
            embedding: row.try_get("embedding")?,
        })
    }
}

#[async_trait::async_trait]
impl MemoryStore for PostgresMemoryStore {
    async fn ensure_session(&self, session: &Session) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO advisor_sessions (session_id, label, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(session.session_id)
        .bind(&session.label)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AdvisorError::DatabaseError(format!("Failed to register session: {}", e))
        })?;

        Ok(())
    }

    async fn append(&self, turns: &[ConversationTurn]) -> Result<()> {
        self.ensure_schema().await?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AdvisorError::DatabaseError(format!(
                "Failed to begin transaction for appending turns: {}",
                e
            ))
        })?;

        for turn in turns {
            sqlx::query(
                r#"
                INSERT INTO conversation_turns
                  (turn_id, session_id, role, text, embedding, created_at)
                VALUES
                  ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(turn.turn_id)
            .bind(turn.session_id)
            .bind(turn.role.as_str())
            .bind(&turn.text)
            .bind(&turn.embedding)
            .bind(turn.timestamp)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AdvisorError::DatabaseError(format!(
                    "Failed to insert conversation turn: {}",
                    e
                ))
            })?;
        }

        tx.commit().await.map_err(|e| {
            AdvisorError::DatabaseError(format!("Failed to commit conversation turns: {}", e))
        })?;

        debug!(count = turns.len(), "Appended conversation turns");
        Ok(())
    }

    async fn history(
        &self,
        session_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationTurn>> {
        self.ensure_schema().await?;

        // Newest first under the limit, then flipped back to append order.
        let rows = sqlx::query(
            r#"
            SELECT turn_id, session_id, role, text, embedding, created_at
            FROM conversation_turns
            WHERE session_id = $1
            ORDER BY seq DESC
            LIMIT $2
            "#,
        )
        .bind(session_id)
        .bind(limit.map(|l| l as i64).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AdvisorError::DatabaseError(format!("Failed to load conversation history: {}", e))
        })?;

        let mut turns = rows
            .iter()
            .map(Self::turn_from_row)
            .collect::<Result<Vec<_>>>()?;
        turns.reverse();

        Ok(turns)
    }

    async fn turn_count(&self, session_id: Uuid) -> Result<usize> {
        self.ensure_schema().await?;

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversation_turns WHERE session_id = $1")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AdvisorError::DatabaseError(format!("Failed to count turns: {}", e))
                })?;

        Ok(count.max(0) as usize)
    }

    async fn clear(&self, session_id: Uuid) -> Result<u64> {
        self.ensure_schema().await?;

        let result = sqlx::query("DELETE FROM conversation_turns WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AdvisorError::DatabaseError(format!(
                    "Failed to clear conversation history: {}",
                    e
                ))
            })?;

        Ok(result.rows_affected())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// Pick the backend from an optional database URL.
pub fn build_store(database_url: Option<&str>) -> Result<Arc<dyn MemoryStore>> {
    match database_url {
        Some(url) => Ok(Arc::new(PostgresMemoryStore::connect_lazy(url)?)),
        None => {
            info!("Conversation memory backend: in-memory");
            Ok(Arc::new(InMemoryMemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(label: &str) -> Session {
        Session::resolve(Some(label), "test-secret").unwrap()
    }

    #[tokio::test]
    async fn test_history_preserves_append_order() {
        let store = InMemoryMemoryStore::new();
        let s = session("order");
        store.ensure_session(&s).await.unwrap();

        let turns: Vec<_> = (0..5)
            .map(|i| ConversationTurn::new(s.session_id, Role::User, format!("Question {}", i)))
            .collect();
        store.append(&turns).await.unwrap();

        let history = store.history(s.session_id, None).await.unwrap();
        let texts: Vec<_> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Question 0", "Question 1", "Question 2", "Question 3", "Question 4"]
        );

        let recent = store.history(s.session_id, Some(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "Question 3");
        assert_eq!(recent[1].text, "Question 4");
    }

    #[tokio::test]
    async fn test_clear_is_scoped_and_idempotent() {
        let store = InMemoryMemoryStore::new();
        let a = session("alpha");
        let b = session("beta");

        store
            .append(&[
                ConversationTurn::new(a.session_id, Role::User, "a1"),
                ConversationTurn::new(b.session_id, Role::User, "b1"),
                ConversationTurn::new(a.session_id, Role::Assistant, "a2"),
            ])
            .await
            .unwrap();

        assert_eq!(store.clear(a.session_id).await.unwrap(), 2);
        assert_eq!(store.clear(a.session_id).await.unwrap(), 0);
        assert_eq!(store.turn_count(a.session_id).await.unwrap(), 0);
        assert_eq!(store.turn_count(b.session_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ensure_session_keeps_first_creation() {
        let store = InMemoryMemoryStore::new();
        let first = session("keep");
        let mut second = first.clone();
        second.created_at = first.created_at + chrono::Duration::seconds(30);

        store.ensure_session(&first).await.unwrap();
        store.ensure_session(&second).await.unwrap();

        let stored = store.session(first.session_id).await.unwrap();
        assert_eq!(stored.created_at, first.created_at);
    }

    #[test]
    fn test_build_store_without_url_is_in_memory() {
        let store = build_store(None).unwrap();
        assert_eq!(store.backend_name(), "in-memory");
    }
}
