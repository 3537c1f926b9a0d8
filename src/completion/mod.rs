//! Language-model completion for answer generation.

mod openai;

pub use openai::OpenAICompletionProvider;

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Ordered text fragments produced by a streaming completion.
///
/// The stream is finite: it ends when the underlying completion is exhausted or
/// after yielding a single `Err` item.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for language-model completion providers.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a full completion for the prompt.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Generate a completion as a stream of text fragments in arrival order.
    async fn complete_stream(&self, system: &str, user: &str) -> Result<CompletionStream>;
}
