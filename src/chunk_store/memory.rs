//! In-memory chunk store implementation.
//!
//! Useful for testing and small datasets.

use super::{validate_batch, Chunk, ChunkStore};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory chunk store. Preserves insertion order.
pub struct MemoryChunkStore {
    chunks: RwLock<Vec<Chunk>>,
}

impl MemoryChunkStore {
    /// Create a new in-memory chunk store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn insert_batch(
        &self,
        owner_id: &str,
        chat_id: &str,
        texts: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<usize> {
        validate_batch(texts, embeddings)?;

        let mut store = self.chunks.write().unwrap();
        for (text, embedding) in texts.iter().zip(embeddings) {
            store.push(Chunk::new(
                owner_id.to_string(),
                chat_id.to_string(),
                text.clone(),
                embedding.clone(),
            ));
        }
        Ok(texts.len())
    }

    async fn fetch_chat(&self, owner_id: &str, chat_id: &str) -> Result<Vec<Chunk>> {
        let store = self.chunks.read().unwrap();
        Ok(store
            .iter()
            .filter(|c| c.owner_id == owner_id && c.chat_id == chat_id)
            .cloned()
            .collect())
    }

    async fn delete_chat(&self, owner_id: &str, chat_id: &str) -> Result<usize> {
        let mut store = self.chunks.write().unwrap();
        let initial_len = store.len();
        store.retain(|c| !(c.owner_id == owner_id && c.chat_id == chat_id));
        Ok(initial_len - store.len())
    }

    async fn count(&self, owner_id: &str, chat_id: &str) -> Result<usize> {
        let store = self.chunks.read().unwrap();
        Ok(store
            .iter()
            .filter(|c| c.owner_id == owner_id && c.chat_id == chat_id)
            .count())
    }
}
