//! New-chat command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the new-chat command.
pub async fn run_new_chat(name: &str, settings: Settings) -> Result<()> {
    let owner_id = settings.general.owner_id.clone();
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.create_chat(&owner_id, name).await {
        Ok(chat) => {
            Output::success(&format!("Created chat '{}'", chat.chat_name));
            Output::kv("Chat ID", &chat.chat_id);
            Output::info(&format!(
                "Add documents with: svar ingest <file> --chat {}",
                chat.chat_id
            ));
        }
        Err(e) => {
            Output::error(&format!("Failed to create chat: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
