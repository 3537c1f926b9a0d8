//! Chat registry for Svar.
//!
//! Chats partition chunks and conversation history per user. The retrieval
//! pipeline only consults `exists`; creation and listing are the thin surface
//! the CLI and HTTP API need to set scopes up.

use crate::error::{Result, SvarError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, RwLock};
use tracing::{info, instrument};
use uuid::Uuid;

/// Summary information about a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    /// Chat ID.
    pub chat_id: String,
    /// User-assigned chat name.
    pub chat_name: String,
    /// When the chat was created.
    pub created_at: DateTime<Utc>,
}

/// Trait for chat registry implementations.
#[async_trait]
pub trait ChatRegistry: Send + Sync {
    /// Create a new chat for an owner.
    async fn create(&self, owner_id: &str, chat_name: &str) -> Result<ChatSummary>;

    /// Check whether an (owner, chat) pair exists.
    async fn exists(&self, owner_id: &str, chat_id: &str) -> Result<bool>;

    /// List all chats for an owner, newest first.
    async fn list(&self, owner_id: &str) -> Result<Vec<ChatSummary>>;
}

/// In-memory chat registry.
pub struct MemoryChatRegistry {
    chats: RwLock<Vec<(String, ChatSummary)>>,
}

impl MemoryChatRegistry {
    /// Create a new in-memory chat registry.
    pub fn new() -> Self {
        Self {
            chats: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryChatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatRegistry for MemoryChatRegistry {
    async fn create(&self, owner_id: &str, chat_name: &str) -> Result<ChatSummary> {
        let summary = ChatSummary {
            chat_id: Uuid::new_v4().to_string(),
            chat_name: chat_name.to_string(),
            created_at: Utc::now(),
        };
        let mut chats = self.chats.write().unwrap();
        chats.push((owner_id.to_string(), summary.clone()));
        Ok(summary)
    }

    async fn exists(&self, owner_id: &str, chat_id: &str) -> Result<bool> {
        let chats = self.chats.read().unwrap();
        Ok(chats
            .iter()
            .any(|(owner, c)| owner == owner_id && c.chat_id == chat_id))
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<ChatSummary>> {
        let chats = self.chats.read().unwrap();
        let mut result: Vec<ChatSummary> = chats
            .iter()
            .filter(|(owner, _)| owner == owner_id)
            .map(|(_, c)| c.clone())
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}

/// SQLite-based chat registry.
pub struct SqliteChatRegistry {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chats (
        chat_id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        chat_name TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chats_owner ON chats(owner_id);
"#;

impl SqliteChatRegistry {
    /// Create a new SQLite chat registry.
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

    /// Create an in-memory SQLite chat registry (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl ChatRegistry for SqliteChatRegistry {
    #[instrument(skip(self))]
    async fn create(&self, owner_id: &str, chat_name: &str) -> Result<ChatSummary> {
        let conn = self.conn.lock().map_err(|e| {
            SvarError::Storage(format!("Failed to acquire lock: {}", e))
        })?;

        let summary = ChatSummary {
            chat_id: Uuid::new_v4().to_string(),
            chat_name: chat_name.to_string(),
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO chats (chat_id, owner_id, chat_name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                summary.chat_id,
                owner_id,
                summary.chat_name,
                summary.created_at.to_rfc3339(),
            ],
        )?;

        info!("Created chat {} for {}", summary.chat_id, owner_id);
        Ok(summary)
    }

    async fn exists(&self, owner_id: &str, chat_id: &str) -> Result<bool> {
        let conn = self.conn.lock().map_err(|e| {
            SvarError::Storage(format!("Failed to acquire lock: {}", e))
        })?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chats WHERE owner_id = ?1 AND chat_id = ?2",
            params![owner_id, chat_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, owner_id: &str) -> Result<Vec<ChatSummary>> {
        let conn = self.conn.lock().map_err(|e| {
            SvarError::Storage(format!("Failed to acquire lock: {}", e))
        })?;

        let mut stmt = conn.prepare(
            r#"
            SELECT chat_id, chat_name, created_at
            FROM chats
            WHERE owner_id = ?1
            ORDER BY created_at DESC
            "#,
        )?;

        let chats = stmt.query_map(params![owner_id], |row| {
            let created_at_str: String = row.get(2)?;
            Ok(ChatSummary {
                chat_id: row.get(0)?,
                chat_name: row.get(1)?,
                created_at: DateTime::parse_from_rfc3339(&created_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        Ok(chats.filter_map(|c| c.ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_chat_registry() {
        let registry = SqliteChatRegistry::in_memory().unwrap();

        let chat = registry.create("alice", "project notes").await.unwrap();
        assert!(registry.exists("alice", &chat.chat_id).await.unwrap());
        assert!(!registry.exists("bob", &chat.chat_id).await.unwrap());
        assert!(!registry.exists("alice", "missing").await.unwrap());

        let chats = registry.list("alice").await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].chat_name, "project notes");
        assert!(registry.list("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_chat_registry() {
        let registry = MemoryChatRegistry::new();

        let chat = registry.create("alice", "reading list").await.unwrap();
        assert!(registry.exists("alice", &chat.chat_id).await.unwrap());
        assert!(!registry.exists("bob", &chat.chat_id).await.unwrap());

        registry.create("alice", "second").await.unwrap();
        assert_eq!(registry.list("alice").await.unwrap().len(), 2);
    }
}
