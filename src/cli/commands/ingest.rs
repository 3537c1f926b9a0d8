//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(file: &str, chat_id: &str, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        Output::info("Run 'svar doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let owner_id = settings.general.owner_id.clone();
    let orchestrator = Orchestrator::new(settings)?;

    // Plain text only; rich document formats need external extraction.
    let text = std::fs::read_to_string(file)
        .map_err(|e| anyhow::anyhow!("Failed to read '{}': {}", file, e))?;

    let spinner = Output::spinner("Splitting, embedding, and storing document...");

    match orchestrator.ingest_text(&owner_id, chat_id, &text).await {
        Ok(result) => {
            spinner.finish_and_clear();
            if result.stored_count == 0 {
                Output::warning("Document contained no storable text.");
            } else {
                Output::success(&format!("Stored {} chunks", result.stored_count));
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to ingest document: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
