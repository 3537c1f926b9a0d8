//! Pipeline orchestrator for Svar.
//!
//! Wires the stores and providers together and exposes the core operations:
//! uploading chunks into a chat and streaming grounded answers out of it. All
//! collaborators are injected at construction; nothing is ambient.

use crate::chats::{ChatRegistry, ChatSummary, MemoryChatRegistry, SqliteChatRegistry};
use crate::chunk_store::{ChunkStore, MemoryChunkStore, SqliteChunkStore};
use crate::chunking::{SplitterConfig, TextSplitter};
use crate::completion::{CompletionProvider, OpenAICompletionProvider};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, SvarError};
use crate::history::{Exchange, HistoryStore, MemoryHistoryStore, SqliteHistoryStore};
use crate::rag::{AnswerStream, AnswerStreamer};
use crate::ranking::rank;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// The main orchestrator for the Svar pipeline.
pub struct Orchestrator {
    settings: Settings,
    chunk_store: Arc<dyn ChunkStore>,
    chats: Arc<dyn ChatRegistry>,
    history: Arc<dyn HistoryStore>,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    answerer: AnswerStreamer,
}

impl Orchestrator {
    /// Create a new orchestrator from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let completion: Arc<dyn CompletionProvider> = Arc::new(OpenAICompletionProvider::new(
            &settings.generation.model,
            settings.generation.temperature,
        ));

        let (chunk_store, chats, history): (
            Arc<dyn ChunkStore>,
            Arc<dyn ChatRegistry>,
            Arc<dyn HistoryStore>,
        ) = match settings.store.provider.as_str() {
            "memory" => {
                info!("Using in-memory storage (data is not persisted)");
                (
                    Arc::new(MemoryChunkStore::new()),
                    Arc::new(MemoryChatRegistry::new()),
                    Arc::new(MemoryHistoryStore::new()),
                )
            }
            _ => {
                let path = settings.sqlite_path();
                (
                    Arc::new(SqliteChunkStore::new(&path)?),
                    Arc::new(SqliteChatRegistry::new(&path)?),
                    Arc::new(SqliteHistoryStore::new(&path)?),
                )
            }
        };

        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: settings.chunking.chunk_size,
            chunk_overlap: settings.chunking.chunk_overlap,
        });

        let answerer = AnswerStreamer::new(
            completion,
            history.clone(),
            prompts,
            settings.retrieval.context_chunks,
        );

        Ok(Self {
            settings,
            chunk_store,
            chats,
            history,
            embedder,
            splitter,
            answerer,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        chunk_store: Arc<dyn ChunkStore>,
        chats: Arc<dyn ChatRegistry>,
        history: Arc<dyn HistoryStore>,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        let splitter = TextSplitter::new(SplitterConfig {
            chunk_size: settings.chunking.chunk_size,
            chunk_overlap: settings.chunking.chunk_overlap,
        });

        let answerer = AnswerStreamer::new(
            completion,
            history.clone(),
            prompts,
            settings.retrieval.context_chunks,
        );

        Self {
            settings,
            chunk_store,
            chats,
            history,
            embedder,
            splitter,
            answerer,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Create a new chat for an owner.
    pub async fn create_chat(&self, owner_id: &str, chat_name: &str) -> Result<ChatSummary> {
        self.chats.create(owner_id, chat_name).await
    }

    /// List an owner's chats.
    pub async fn list_chats(&self, owner_id: &str) -> Result<Vec<ChatSummary>> {
        self.chats.list(owner_id).await
    }

    /// Store pre-split chunks into a chat.
    ///
    /// Whitespace-only chunks are filtered out before embedding; the batch
    /// insert is atomic.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn process_upload(
        &self,
        owner_id: &str,
        chat_id: &str,
        chunks: Vec<String>,
    ) -> Result<UploadResult> {
        self.require_chat(owner_id, chat_id).await?;

        let clean_chunks: Vec<String> = chunks
            .into_iter()
            .filter(|c| !c.trim().is_empty())
            .collect();

        if clean_chunks.is_empty() {
            debug!("Nothing to store after filtering empty chunks");
            return Ok(UploadResult { stored_count: 0 });
        }

        let embeddings = self.embedder.embed_batch(&clean_chunks).await?;

        let stored_count = self
            .chunk_store
            .insert_batch(owner_id, chat_id, &clean_chunks, &embeddings)
            .await?;

        info!("Stored {} chunks for {}/{}", stored_count, owner_id, chat_id);
        Ok(UploadResult { stored_count })
    }

    /// Split a raw document text and store the resulting chunks.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub async fn ingest_text(
        &self,
        owner_id: &str,
        chat_id: &str,
        text: &str,
    ) -> Result<UploadResult> {
        let chunks = self.splitter.split(text);
        self.process_upload(owner_id, chat_id, chunks).await
    }

    /// Ask a question against a chat and stream the answer.
    ///
    /// Validation (chat existence, embedding-provider liveness) and retrieval
    /// run before the stream is returned, so callers see those failures as a
    /// plain `Err` with no events emitted. Failures after this point are
    /// reported in-band on the stream.
    #[instrument(skip(self, question), fields(question = %question))]
    pub async fn ask(
        &self,
        owner_id: &str,
        chat_id: &str,
        question: &str,
    ) -> Result<AnswerStream> {
        self.require_chat(owner_id, chat_id).await?;
        self.embedder.probe().await?;

        let query_embedding = self.embedder.embed(question).await?;
        let candidates = self.chunk_store.fetch_chat(owner_id, chat_id).await?;
        let ranked = rank(&query_embedding, &candidates, self.settings.retrieval.top_k);

        debug!(
            "Ranked {} of {} candidates for {}/{}",
            ranked.len(),
            candidates.len(),
            owner_id,
            chat_id
        );

        Ok(self.answerer.stream(owner_id, chat_id, question, ranked))
    }

    /// Get recent conversation history for a chat, newest first.
    pub async fn history(
        &self,
        owner_id: &str,
        chat_id: &str,
        limit: usize,
    ) -> Result<Vec<Exchange>> {
        self.require_chat(owner_id, chat_id).await?;
        self.history.recent(owner_id, chat_id, limit).await
    }

    async fn require_chat(&self, owner_id: &str, chat_id: &str) -> Result<()> {
        if self.chats.exists(owner_id, chat_id).await? {
            Ok(())
        } else {
            Err(SvarError::ChatNotFound(chat_id.to_string()))
        }
    }
}

/// Result of an upload operation.
#[derive(Debug)]
pub struct UploadResult {
    /// Number of chunks stored.
    pub stored_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionStream;
    use crate::rag::{AnswerEvent, NO_INFORMATION_ANSWER};
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder that counts topic keywords, giving deterministic vectors.
    struct KeywordEmbedder;

    const KEYWORDS: [&str; 4] = ["france", "paris", "japan", "tokyo"];

    impl KeywordEmbedder {
        fn vectorize(text: &str) -> Vec<f32> {
            let lower = text.to_lowercase();
            KEYWORDS
                .iter()
                .map(|kw| lower.matches(kw).count() as f32)
                .collect()
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> crate::error::Result<Vec<f32>> {
            Ok(Self::vectorize(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> crate::error::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
        }

        fn dimensions(&self) -> usize {
            KEYWORDS.len()
        }
    }

    /// Embedder whose provider is down.
    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        async fn embed(&self, _text: &str) -> crate::error::Result<Vec<f32>> {
            Err(SvarError::Embedding("service unavailable".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> crate::error::Result<Vec<Vec<f32>>> {
            Err(SvarError::Embedding("service unavailable".to_string()))
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    /// Completion provider emitting fixed fragments.
    struct FixedCompletion {
        fragments: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl FixedCompletion {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for FixedCompletion {
        async fn complete(&self, _system: &str, _user: &str) -> crate::error::Result<String> {
            Ok(self.fragments.concat())
        }

        async fn complete_stream(
            &self,
            _system: &str,
            _user: &str,
        ) -> crate::error::Result<CompletionStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let items: Vec<crate::error::Result<String>> =
                self.fragments.iter().map(|f| Ok(f.to_string())).collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn test_orchestrator(
        embedder: Arc<dyn Embedder>,
        completion: Arc<FixedCompletion>,
    ) -> Orchestrator {
        Orchestrator::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(MemoryChunkStore::new()),
            Arc::new(MemoryChatRegistry::new()),
            Arc::new(MemoryHistoryStore::new()),
            embedder,
            completion,
        )
    }

    #[tokio::test]
    async fn test_upload_then_ask_streams_and_persists() {
        let completion = Arc::new(FixedCompletion::new(vec!["Par", "is."]));
        let orchestrator = test_orchestrator(Arc::new(KeywordEmbedder), completion);

        let chat = orchestrator.create_chat("alice", "geo").await.unwrap();

        let result = orchestrator
            .process_upload(
                "alice",
                &chat.chat_id,
                vec![
                    "Paris is the capital of France.".to_string(),
                    "Tokyo is the capital of Japan.".to_string(),
                ],
            )
            .await
            .unwrap();
        assert_eq!(result.stored_count, 2);

        let events: Vec<AnswerEvent> = orchestrator
            .ask("alice", &chat.chat_id, "What is the capital of France?")
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                AnswerEvent::AnswerChunk("Par".to_string()),
                AnswerEvent::AnswerChunk("is.".to_string()),
            ]
        );

        let history = orchestrator
            .history("alice", &chat.chat_id, 10)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].answer, "Paris.");
    }

    #[tokio::test]
    async fn test_france_question_ranks_paris_chunk_first() {
        let chunks = vec![
            crate::chunk_store::Chunk::new(
                "alice".into(),
                "c".into(),
                "Paris is the capital of France.".into(),
                KeywordEmbedder::vectorize("Paris is the capital of France."),
            ),
            crate::chunk_store::Chunk::new(
                "alice".into(),
                "c".into(),
                "Tokyo is the capital of Japan.".into(),
                KeywordEmbedder::vectorize("Tokyo is the capital of Japan."),
            ),
        ];

        let query = KeywordEmbedder::vectorize("What is the capital of France?");
        let ranked = rank(&query, &chunks, 5);

        assert_eq!(ranked[0].text, "Paris is the capital of France.");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[tokio::test]
    async fn test_ask_unknown_chat_is_rejected() {
        let completion = Arc::new(FixedCompletion::new(vec!["never"]));
        let orchestrator = test_orchestrator(Arc::new(KeywordEmbedder), completion);

        let result = orchestrator.ask("alice", "missing", "question").await;
        assert!(matches!(result, Err(SvarError::ChatNotFound(_))));
    }

    #[tokio::test]
    async fn test_ask_fails_fast_when_embedder_is_down() {
        let completion = Arc::new(FixedCompletion::new(vec!["never"]));
        let orchestrator = test_orchestrator(Arc::new(DownEmbedder), completion.clone());

        let chat = orchestrator.create_chat("alice", "geo").await.unwrap();
        let result = orchestrator.ask("alice", &chat.chat_id, "question").await;

        assert!(matches!(result, Err(SvarError::Embedding(_))));
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_empty_chat_yields_canned_answer() {
        let completion = Arc::new(FixedCompletion::new(vec!["never"]));
        let orchestrator = test_orchestrator(Arc::new(KeywordEmbedder), completion.clone());

        let chat = orchestrator.create_chat("alice", "empty").await.unwrap();

        let events: Vec<AnswerEvent> = orchestrator
            .ask("alice", &chat.chat_id, "question")
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(
            events,
            vec![AnswerEvent::AnswerChunk(NO_INFORMATION_ANSWER.to_string())]
        );
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
        assert!(orchestrator
            .history("alice", &chat.chat_id, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_upload_filters_empty_chunks() {
        let completion = Arc::new(FixedCompletion::new(vec![]));
        let orchestrator = test_orchestrator(Arc::new(KeywordEmbedder), completion);

        let chat = orchestrator.create_chat("alice", "geo").await.unwrap();

        let result = orchestrator
            .process_upload(
                "alice",
                &chat.chat_id,
                vec!["real chunk".to_string(), "   ".to_string(), "".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(result.stored_count, 1);

        let result = orchestrator
            .process_upload("alice", &chat.chat_id, vec!["  ".to_string()])
            .await
            .unwrap();
        assert_eq!(result.stored_count, 0);
    }

    #[tokio::test]
    async fn test_ingest_text_splits_and_stores() {
        let completion = Arc::new(FixedCompletion::new(vec![]));
        let orchestrator = test_orchestrator(Arc::new(KeywordEmbedder), completion);

        let chat = orchestrator.create_chat("alice", "doc").await.unwrap();

        let text = "Paris is the capital of France. ".repeat(40);
        let result = orchestrator
            .ingest_text("alice", &chat.chat_id, &text)
            .await
            .unwrap();
        assert!(result.stored_count > 1);
    }
}
