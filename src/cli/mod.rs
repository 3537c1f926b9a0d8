//! CLI module for Svar.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Svar - Document Question Answering
///
/// A retrieval-augmented question-answering service for your documents.
/// The name "Svar" comes from the Norwegian/Scandinavian word for "answer."
#[derive(Parser, Debug)]
#[command(name = "svar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Svar and verify configuration
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Create a new chat
    NewChat {
        /// Name for the new chat
        name: String,
    },

    /// List your chats
    Chats,

    /// Ingest a plain-text document into a chat
    Ingest {
        /// Path to a plain-text file
        file: String,

        /// Chat to store the document under
        #[arg(long)]
        chat: String,
    },

    /// Ask a question and stream the answer from a chat's documents
    Ask {
        /// The question to ask
        question: String,

        /// Chat to ask against
        #[arg(long)]
        chat: String,

        /// LLM model to use for answer generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show recent conversation history for a chat
    History {
        /// Chat to show history for
        #[arg(long)]
        chat: String,

        /// Maximum number of exchanges to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
