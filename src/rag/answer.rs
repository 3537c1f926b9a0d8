//! Streaming answer generation.

use super::context::format_context_for_prompt;
use super::{AnswerEvent, AnswerStream};
use crate::completion::CompletionProvider;
use crate::config::Prompts;
use crate::history::{Exchange, HistoryStore};
use crate::ranking::RankedChunk;
use async_stream::stream;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Answer returned when a chat has no stored chunks to ground on.
pub const NO_INFORMATION_ANSWER: &str =
    "I couldn't find any relevant information in your documents for this question.";

/// In-band error message emitted when generation fails mid-stream.
pub const GENERATION_ERROR_MESSAGE: &str = "Error generating answer";

/// Streams grounded answers and persists completed exchanges.
pub struct AnswerStreamer {
    completion: Arc<dyn CompletionProvider>,
    history: Arc<dyn HistoryStore>,
    prompts: Prompts,
    context_chunks: usize,
}

impl AnswerStreamer {
    /// Create a new answer streamer.
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        history: Arc<dyn HistoryStore>,
        prompts: Prompts,
        context_chunks: usize,
    ) -> Self {
        Self {
            completion,
            history,
            prompts,
            context_chunks,
        }
    }

    /// Stream an answer grounded in the given ranked chunks.
    ///
    /// With no chunks, yields one canned answer and makes no model call. On a
    /// mid-stream failure, yields exactly one terminal error event and persists
    /// nothing; fragments already delivered are not retracted. On normal
    /// exhaustion the accumulated exchange is written to history — a failed
    /// write is logged and swallowed, since the caller already has the answer.
    /// Dropping the stream stops the underlying completion and persists nothing.
    pub fn stream(
        &self,
        owner_id: &str,
        chat_id: &str,
        question: &str,
        ranked: Vec<RankedChunk>,
    ) -> AnswerStream {
        let completion = self.completion.clone();
        let history = self.history.clone();
        let prompts = self.prompts.clone();
        let context_chunks = self.context_chunks;
        let owner_id = owner_id.to_string();
        let chat_id = chat_id.to_string();
        let question = question.to_string();

        let events = stream! {
            if ranked.is_empty() {
                info!("No chunks stored for {}/{}", owner_id, chat_id);
                yield AnswerEvent::AnswerChunk(NO_INFORMATION_ANSWER.to_string());
                return;
            }

            let take = ranked.len().min(context_chunks.max(1));
            let context = format_context_for_prompt(&ranked[..take]);

            let mut vars = HashMap::new();
            vars.insert("context".to_string(), context);
            vars.insert("question".to_string(), question.clone());
            let user_prompt = prompts.render_with_custom(&prompts.rag.user, &vars);

            let mut fragments = match completion
                .complete_stream(&prompts.rag.system, &user_prompt)
                .await
            {
                Ok(s) => s,
                Err(e) => {
                    warn!("Completion request failed: {}", e);
                    yield AnswerEvent::Error(GENERATION_ERROR_MESSAGE.to_string());
                    return;
                }
            };

            let mut answer = String::new();
            while let Some(item) = fragments.next().await {
                match item {
                    Ok(fragment) => {
                        answer.push_str(&fragment);
                        yield AnswerEvent::AnswerChunk(fragment);
                    }
                    Err(e) => {
                        warn!("Completion stream failed mid-answer: {}", e);
                        yield AnswerEvent::Error(GENERATION_ERROR_MESSAGE.to_string());
                        return;
                    }
                }
            }

            // The caller already received the streamed answer; a failed history
            // write must not invalidate it.
            if let Err(e) = history
                .append(&owner_id, &chat_id, Exchange::new(question, answer))
                .await
            {
                warn!("Failed to persist exchange for {}/{}: {}", owner_id, chat_id, e);
            }
        };

        Box::pin(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionStream;
    use crate::error::{Result, SvarError};
    use crate::history::MemoryHistoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// What a scripted completion should emit.
    enum ScriptedItem {
        Fragment(&'static str),
        Fail,
    }

    /// Completion provider that replays a fixed script.
    struct ScriptedCompletion {
        script: Vec<ScriptedItem>,
        calls: AtomicUsize,
    }

    impl ScriptedCompletion {
        fn new(script: Vec<ScriptedItem>) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedCompletion {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Err(SvarError::Generation("not scripted".to_string()))
        }

        async fn complete_stream(&self, _system: &str, _user: &str) -> Result<CompletionStream> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let items: Vec<Result<String>> = self
                .script
                .iter()
                .map(|item| match item {
                    ScriptedItem::Fragment(s) => Ok(s.to_string()),
                    ScriptedItem::Fail => {
                        Err(SvarError::Generation("scripted failure".to_string()))
                    }
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn ranked(text: &str, score: f32) -> RankedChunk {
        RankedChunk {
            text: text.to_string(),
            score,
        }
    }

    fn streamer(
        completion: Arc<ScriptedCompletion>,
        history: Arc<MemoryHistoryStore>,
    ) -> AnswerStreamer {
        AnswerStreamer::new(completion, history, Prompts::default(), 3)
    }

    #[tokio::test]
    async fn test_fragments_forwarded_in_order_and_exchange_persisted() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            ScriptedItem::Fragment("Par"),
            ScriptedItem::Fragment("is."),
        ]));
        let history = Arc::new(MemoryHistoryStore::new());
        let streamer = streamer(completion.clone(), history.clone());

        let events: Vec<AnswerEvent> = streamer
            .stream(
                "alice",
                "chat1",
                "What is the capital of France?",
                vec![ranked("Paris is the capital of France.", 0.9)],
            )
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                AnswerEvent::AnswerChunk("Par".to_string()),
                AnswerEvent::AnswerChunk("is.".to_string()),
            ]
        );

        let recent = history.recent("alice", "chat1", 10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].question, "What is the capital of France?");
        assert_eq!(recent[0].answer, "Paris.");
    }

    #[tokio::test]
    async fn test_mid_stream_failure_yields_terminal_error_and_persists_nothing() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            ScriptedItem::Fragment("Par"),
            ScriptedItem::Fail,
        ]));
        let history = Arc::new(MemoryHistoryStore::new());
        let streamer = streamer(completion.clone(), history.clone());

        let events: Vec<AnswerEvent> = streamer
            .stream("alice", "chat1", "question", vec![ranked("context", 0.5)])
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                AnswerEvent::AnswerChunk("Par".to_string()),
                AnswerEvent::Error(GENERATION_ERROR_MESSAGE.to_string()),
            ]
        );

        assert!(history.recent("alice", "chat1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_chunks_yields_canned_answer_without_model_call() {
        let completion = Arc::new(ScriptedCompletion::new(vec![ScriptedItem::Fragment(
            "should never be emitted",
        )]));
        let history = Arc::new(MemoryHistoryStore::new());
        let streamer = streamer(completion.clone(), history.clone());

        let events: Vec<AnswerEvent> = streamer
            .stream("alice", "chat1", "question", Vec::new())
            .collect()
            .await;

        assert_eq!(
            events,
            vec![AnswerEvent::AnswerChunk(NO_INFORMATION_ANSWER.to_string())]
        );
        assert_eq!(completion.call_count(), 0);
        assert!(history.recent("alice", "chat1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_stream_persists_nothing() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            ScriptedItem::Fragment("Par"),
            ScriptedItem::Fragment("is."),
        ]));
        let history = Arc::new(MemoryHistoryStore::new());
        let streamer = streamer(completion.clone(), history.clone());

        let mut events =
            streamer.stream("alice", "chat1", "question", vec![ranked("context", 0.5)]);

        // Consume one fragment, then disconnect.
        let first = events.next().await;
        assert_eq!(first, Some(AnswerEvent::AnswerChunk("Par".to_string())));
        drop(events);

        assert!(history.recent("alice", "chat1", 10).await.unwrap().is_empty());
    }
}
