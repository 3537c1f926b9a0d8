//! Retrieval-augmented answer generation.
//!
//! Assembles a grounded prompt from ranked chunks, streams the model's answer
//! to the caller as it arrives, and persists the completed exchange.

pub mod context;
mod answer;

pub use answer::{AnswerStreamer, GENERATION_ERROR_MESSAGE, NO_INFORMATION_ANSWER};

use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// One event in a streamed answer.
///
/// Serialized as `{"type":"answer_chunk","content":...}` or
/// `{"type":"error","content":...}` — one JSON object per line on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum AnswerEvent {
    /// An incremental answer fragment, in arrival order.
    AnswerChunk(String),
    /// Terminal error event; nothing follows it.
    Error(String),
}

/// A finite, non-restartable stream of answer events.
pub type AnswerStream = Pin<Box<dyn Stream<Item = AnswerEvent> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_event_wire_shape() {
        let chunk = AnswerEvent::AnswerChunk("Par".to_string());
        assert_eq!(
            serde_json::to_string(&chunk).unwrap(),
            r#"{"type":"answer_chunk","content":"Par"}"#
        );

        let error = AnswerEvent::Error("Error generating answer".to_string());
        assert_eq!(
            serde_json::to_string(&error).unwrap(),
            r#"{"type":"error","content":"Error generating answer"}"#
        );
    }

    #[test]
    fn test_answer_event_roundtrip() {
        let event: AnswerEvent =
            serde_json::from_str(r#"{"type":"answer_chunk","content":"hi"}"#).unwrap();
        assert_eq!(event, AnswerEvent::AnswerChunk("hi".to_string()));
    }
}
