//! Chats command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the chats command.
pub async fn run_chats(settings: Settings) -> Result<()> {
    let owner_id = settings.general.owner_id.clone();
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.list_chats(&owner_id).await {
        Ok(chats) => {
            if chats.is_empty() {
                Output::info("No chats yet. Use 'svar new-chat <name>' to create one.");
            } else {
                Output::header(&format!("Chats ({})", chats.len()));
                println!();

                for chat in &chats {
                    Output::chat_info(
                        &chat.chat_name,
                        &chat.chat_id,
                        &chat.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list chats: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
