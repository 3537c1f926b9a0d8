//! Svar - Document Question Answering
//!
//! A retrieval-augmented question-answering service for your documents.
//!
//! The name "Svar" comes from the Norwegian/Scandinavian word for "answer."
//!
//! # Overview
//!
//! Svar allows you to:
//! - Ingest documents into per-user chats
//! - Embed and store document chunks for similarity search
//! - Ask questions and stream grounded, AI-generated answers
//! - Keep per-chat conversation history
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `chunking` - Document text splitting
//! - `embedding` - Embedding generation
//! - `completion` - Language-model completion
//! - `chunk_store` - Chunk storage abstraction
//! - `ranking` - Similarity ranking
//! - `chats` - Chat registry
//! - `history` - Conversation history
//! - `rag` - Grounded answer streaming
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use svar::config::Settings;
//! use svar::orchestrator::Orchestrator;
//! use svar::rag::AnswerEvent;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let chat = orchestrator.create_chat("local", "notes").await?;
//!     orchestrator
//!         .ingest_text("local", &chat.chat_id, "Paris is the capital of France.")
//!         .await?;
//!
//!     let mut events = orchestrator
//!         .ask("local", &chat.chat_id, "What is the capital of France?")
//!         .await?;
//!     while let Some(event) = events.next().await {
//!         if let AnswerEvent::AnswerChunk(fragment) = event {
//!             print!("{}", fragment);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod chats;
pub mod chunk_store;
pub mod chunking;
pub mod cli;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod history;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod ranking;

pub use error::{Result, SvarError};
