//! Embedding generation for similarity search and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
///
/// Implementations must be dimensionally consistent: every vector they return has
/// `dimensions()` entries, and vectors from different providers must never be
/// compared against each other.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Liveness probe, run before committing to answer generation.
    ///
    /// The default implementation embeds a single short text and discards the
    /// result; failure means the provider is unreachable or misbehaving.
    async fn probe(&self) -> Result<()> {
        self.embed("ping").await.map(|_| ())
    }
}
