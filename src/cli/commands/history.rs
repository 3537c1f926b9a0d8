//! History command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the history command.
pub async fn run_history(chat_id: &str, limit: Option<usize>, settings: Settings) -> Result<()> {
    let owner_id = settings.general.owner_id.clone();
    let limit = limit.unwrap_or(settings.generation.history_limit);
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.history(&owner_id, chat_id, limit).await {
        Ok(exchanges) => {
            if exchanges.is_empty() {
                Output::info("No history for this chat yet.");
            } else {
                Output::header(&format!("History ({})", exchanges.len()));
                for exchange in &exchanges {
                    Output::exchange(
                        &exchange.question,
                        &exchange.answer,
                        &exchange.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                    );
                }
                println!();
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to load history: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
