//! Conversation history for Svar.
//!
//! Each chat accumulates an append-only list of question/answer exchanges.
//! Exchanges are written once, after a streamed answer completes, and read back
//! for history display.

use crate::error::{Result, SvarError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

/// One question/answer pair bound to a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    /// The question as asked.
    pub question: String,
    /// The full accumulated answer.
    pub answer: String,
    /// When the exchange completed.
    pub timestamp: DateTime<Utc>,
}

impl Exchange {
    /// Create a new exchange stamped with the current time.
    pub fn new(question: String, answer: String) -> Self {
        Self {
            question,
            answer,
            timestamp: Utc::now(),
        }
    }
}

/// Trait for conversation history implementations.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append an exchange to a chat's history.
    async fn append(&self, owner_id: &str, chat_id: &str, exchange: Exchange) -> Result<()>;

    /// Get the most recent exchanges for a chat, newest first.
    async fn recent(&self, owner_id: &str, chat_id: &str, limit: usize) -> Result<Vec<Exchange>>;
}

/// In-memory history store.
pub struct MemoryHistoryStore {
    exchanges: RwLock<Vec<(String, String, Exchange)>>,
}

impl MemoryHistoryStore {
    /// Create a new in-memory history store.
    pub fn new() -> Self {
        Self {
            exchanges: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, owner_id: &str, chat_id: &str, exchange: Exchange) -> Result<()> {
        let mut exchanges = self.exchanges.write().unwrap();
        exchanges.push((owner_id.to_string(), chat_id.to_string(), exchange));
        Ok(())
    }

    async fn recent(&self, owner_id: &str, chat_id: &str, limit: usize) -> Result<Vec<Exchange>> {
        let exchanges = self.exchanges.read().unwrap();
        Ok(exchanges
            .iter()
            .filter(|(owner, chat, _)| owner == owner_id && chat == chat_id)
            .rev()
            .take(limit)
            .map(|(_, _, e)| e.clone())
            .collect())
    }
}

/// SQLite-based history store.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS exchanges (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        chat_id TEXT NOT NULL,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_exchanges_owner_chat ON exchanges(owner_id, chat_id);
"#;

impl SqliteHistoryStore {
    /// Create a new SQLite history store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite history store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    #[instrument(skip(self, exchange))]
    async fn append(&self, owner_id: &str, chat_id: &str, exchange: Exchange) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| {
            SvarError::Storage(format!("Failed to acquire lock: {}", e))
        })?;

        conn.execute(
            r#"
            INSERT INTO exchanges (owner_id, chat_id, question, answer, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                owner_id,
                chat_id,
                exchange.question,
                exchange.answer,
                exchange.timestamp.to_rfc3339(),
            ],
        )?;

        debug!("Stored exchange for {}/{}", owner_id, chat_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, owner_id: &str, chat_id: &str, limit: usize) -> Result<Vec<Exchange>> {
        let conn = self.conn.lock().map_err(|e| {
            SvarError::Storage(format!("Failed to acquire lock: {}", e))
        })?;

        let mut stmt = conn.prepare(
            r#"
            SELECT question, answer, timestamp
            FROM exchanges
            WHERE owner_id = ?1 AND chat_id = ?2
            ORDER BY id DESC
            LIMIT ?3
            "#,
        )?;

        let exchanges = stmt.query_map(params![owner_id, chat_id, limit as i64], |row| {
            let timestamp_str: String = row.get(2)?;
            Ok(Exchange {
                question: row.get(0)?,
                answer: row.get(1)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        Ok(exchanges.filter_map(|e| e.ok()).collect())
    }
}
