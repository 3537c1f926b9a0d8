//! Chunk storage abstraction for Svar.
//!
//! Provides a trait-based interface for different storage backends. Chunks are
//! scoped by an (owner, chat) key pair and are immutable once stored.

mod memory;
mod sqlite;

pub use memory::MemoryChunkStore;
pub use sqlite::SqliteChunkStore;

use crate::error::{Result, SvarError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored document chunk with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID.
    pub id: Uuid,
    /// Identity of the uploading user.
    pub owner_id: String,
    /// Chat this chunk belongs to.
    pub chat_id: String,
    /// Text content of this chunk.
    pub text: String,
    /// Embedding vector. Length is fixed by the embedding provider in use.
    pub embedding: Vec<f32>,
    /// When this chunk was stored.
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(owner_id: String, chat_id: String, text: String, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            chat_id,
            text,
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// Trait for chunk store implementations.
///
/// `insert_batch` is atomic: either every record in the batch is written or none
/// is. `fetch_chat` returns chunks in insertion order, which downstream ranking
/// relies on for stable tie-breaking.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Store a batch of chunks for an (owner, chat) pair.
    ///
    /// Fails with `InvalidInput` and writes nothing when `texts` and
    /// `embeddings` differ in length or any text is empty after trimming.
    async fn insert_batch(
        &self,
        owner_id: &str,
        chat_id: &str,
        texts: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<usize>;

    /// Fetch all chunks for an (owner, chat) pair, in insertion order.
    async fn fetch_chat(&self, owner_id: &str, chat_id: &str) -> Result<Vec<Chunk>>;

    /// Delete all chunks for an (owner, chat) pair.
    async fn delete_chat(&self, owner_id: &str, chat_id: &str) -> Result<usize>;

    /// Get the chunk count for an (owner, chat) pair.
    async fn count(&self, owner_id: &str, chat_id: &str) -> Result<usize>;
}

/// Validate an insert batch before any write happens.
pub(crate) fn validate_batch(texts: &[String], embeddings: &[Vec<f32>]) -> Result<()> {
    if texts.len() != embeddings.len() {
        return Err(SvarError::InvalidInput(format!(
            "Chunk/embedding count mismatch: {} chunks, {} embeddings",
            texts.len(),
            embeddings.len()
        )));
    }
    if texts.iter().any(|t| t.trim().is_empty()) {
        return Err(SvarError::InvalidInput(
            "Chunk text must not be empty".to_string(),
        ));
    }
    Ok(())
}
