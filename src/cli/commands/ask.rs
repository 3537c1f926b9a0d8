//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::AnswerEvent;
use anyhow::Result;
use futures::StreamExt;
use std::io::Write;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    chat_id: &str,
    model: Option<String>,
    mut settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'svar doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.generation.model = model;
    }

    let owner_id = settings.general.owner_id.clone();
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching documents...");

    let mut events = match orchestrator.ask(&owner_id, chat_id, question).await {
        Ok(stream) => {
            spinner.finish_and_clear();
            stream
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to answer question: {}", e));
            return Err(e.into());
        }
    };

    // Print fragments as they arrive.
    println!();
    let mut stdout = std::io::stdout();
    while let Some(event) = events.next().await {
        match event {
            AnswerEvent::AnswerChunk(fragment) => {
                print!("{}", fragment);
                stdout.flush()?;
            }
            AnswerEvent::Error(msg) => {
                println!();
                Output::error(&msg);
                anyhow::bail!("answer generation failed");
            }
        }
    }
    println!("\n");

    Ok(())
}
