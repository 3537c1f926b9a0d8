//! SQLite-based chunk store implementation.
//!
//! Embeddings are stored as little-endian f32 BLOBs and similarity is computed
//! in Rust by the ranking module. For large datasets consider the sqlite-vec
//! extension or a dedicated vector database.

use super::{validate_batch, Chunk, ChunkStore};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

/// SQLite-based chunk store.
pub struct SqliteChunkStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        chat_id TEXT NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_owner_chat ON chunks(owner_id, chat_id);
"#;

impl SqliteChunkStore {
    /// Create a new SQLite chunk store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite chunk store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite chunk store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chunk> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(4)?;
        let created_at_str: String = row.get(5)?;

        Ok(Chunk {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            owner_id: row.get(1)?,
            chat_id: row.get(2)?,
            text: row.get(3)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    #[instrument(skip(self, texts, embeddings), fields(count = texts.len()))]
    async fn insert_batch(
        &self,
        owner_id: &str,
        chat_id: &str,
        texts: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<usize> {
        validate_batch(texts, embeddings)?;

        let conn = self.conn.lock().map_err(|e| {
            SvarError::Storage(format!("Failed to acquire lock: {}", e))
        })?;

        // One transaction per batch: either every chunk lands or none does.
        let tx = conn.unchecked_transaction()?;

        for (text, embedding) in texts.iter().zip(embeddings) {
            let chunk = Chunk::new(
                owner_id.to_string(),
                chat_id.to_string(),
                text.clone(),
                embedding.clone(),
            );

            tx.execute(
                r#"
                INSERT INTO chunks (id, owner_id, chat_id, text, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    chunk.id.to_string(),
                    chunk.owner_id,
                    chunk.chat_id,
                    chunk.text,
                    Self::embedding_to_bytes(&chunk.embedding),
                    chunk.created_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Stored {} chunks for {}/{}", texts.len(), owner_id, chat_id);
        Ok(texts.len())
    }

    #[instrument(skip(self))]
    async fn fetch_chat(&self, owner_id: &str, chat_id: &str) -> Result<Vec<Chunk>> {
        let conn = self.conn.lock().map_err(|e| {
            SvarError::Storage(format!("Failed to acquire lock: {}", e))
        })?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, owner_id, chat_id, text, embedding, created_at
            FROM chunks
            WHERE owner_id = ?1 AND chat_id = ?2
            ORDER BY rowid
            "#,
        )?;

        let chunks = stmt.query_map(params![owner_id, chat_id], Self::row_to_chunk)?;

        let result: Vec<Chunk> = chunks.filter_map(|c| c.ok()).collect();
        debug!("Fetched {} chunks for {}/{}", result.len(), owner_id, chat_id);
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn delete_chat(&self, owner_id: &str, chat_id: &str) -> Result<usize> {
        let conn = self.conn.lock().map_err(|e| {
            SvarError::Storage(format!("Failed to acquire lock: {}", e))
        })?;

        let deleted = conn.execute(
            "DELETE FROM chunks WHERE owner_id = ?1 AND chat_id = ?2",
            params![owner_id, chat_id],
        )?;

        info!("Deleted {} chunks for {}/{}", deleted, owner_id, chat_id);
        Ok(deleted)
    }

    async fn count(&self, owner_id: &str, chat_id: &str) -> Result<usize> {
        let conn = self.conn.lock().map_err(|e| {
            SvarError::Storage(format!("Failed to acquire lock: {}", e))
        })?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE owner_id = ?1 AND chat_id = ?2",
            params![owner_id, chat_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SvarError;

    #[tokio::test]
    async fn test_sqlite_chunk_store_roundtrip() {
        let store = SqliteChunkStore::in_memory().unwrap();

        let texts = vec![
            "Paris is the capital of France.".to_string(),
            "Tokyo is the capital of Japan.".to_string(),
        ];
        let embeddings = vec![vec![1.0, 0.0, 0.5], vec![0.0, 1.0, -0.5]];

        let stored = store
            .insert_batch("alice", "chat1", &texts, &embeddings)
            .await
            .unwrap();
        assert_eq!(stored, 2);

        let chunks = store.fetch_chat("alice", "chat1").await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Paris is the capital of France.");
        assert_eq!(chunks[0].embedding, vec![1.0, 0.0, 0.5]);
        assert_eq!(chunks[1].embedding, vec![0.0, 1.0, -0.5]);

        let deleted = store.delete_chat("alice", "chat1").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.fetch_chat("alice", "chat1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_preserves_insertion_order() {
        let store = SqliteChunkStore::in_memory().unwrap();

        for i in 0..5 {
            store
                .insert_batch(
                    "alice",
                    "chat1",
                    &[format!("chunk {}", i)],
                    &[vec![i as f32]],
                )
                .await
                .unwrap();
        }

        let chunks = store.fetch_chat("alice", "chat1").await.unwrap();
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["chunk 0", "chunk 1", "chunk 2", "chunk 3", "chunk 4"]
        );
    }

    #[tokio::test]
    async fn test_mismatched_batch_is_rejected() {
        let store = SqliteChunkStore::in_memory().unwrap();

        let result = store
            .insert_batch("alice", "chat1", &["a".to_string()], &[])
            .await;

        assert!(matches!(result, Err(SvarError::InvalidInput(_))));
        assert_eq!(store.count("alice", "chat1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("svar.db");

        {
            let store = SqliteChunkStore::new(&path).unwrap();
            store
                .insert_batch("alice", "chat1", &["persisted".to_string()], &[vec![1.0, 2.0]])
                .await
                .unwrap();
        }

        let store = SqliteChunkStore::new(&path).unwrap();
        let chunks = store.fetch_chat("alice", "chat1").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "persisted");
        assert_eq!(chunks[0].embedding, vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_scope_isolation() {
        let store = SqliteChunkStore::in_memory().unwrap();

        store
            .insert_batch("alice", "chat1", &["a".to_string()], &[vec![1.0]])
            .await
            .unwrap();
        store
            .insert_batch("alice", "chat2", &["b".to_string()], &[vec![2.0]])
            .await
            .unwrap();

        let chunks = store.fetch_chat("alice", "chat1").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "a");
        assert!(store.fetch_chat("bob", "chat1").await.unwrap().is_empty());
    }
}
