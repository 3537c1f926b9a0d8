//! OpenAI chat-completion provider.

use super::{CompletionProvider, CompletionStream};
use crate::error::{Result, SvarError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, instrument};

/// OpenAI-based completion provider.
pub struct OpenAICompletionProvider {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAICompletionProvider {
    /// Create a new completion provider for the given model.
    pub fn new(model: &str, temperature: f32) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            temperature,
        }
    }

    fn build_request(&self, system: &str, user: &str) -> Result<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(|e| SvarError::Generation(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user.to_string())
                .build()
                .map_err(|e| SvarError::Generation(e.to_string()))?
                .into(),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| SvarError::Generation(e.to_string()))
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompletionProvider {
    #[instrument(skip(self, system, user))]
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = self.build_request(system, user)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SvarError::OpenAI(format!("Completion API error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| SvarError::Generation("Empty response from model".to_string()))
    }

    #[instrument(skip(self, system, user))]
    async fn complete_stream(&self, system: &str, user: &str) -> Result<CompletionStream> {
        let request = self.build_request(system, user)?;
        let client = self.client.clone();

        let stream = try_stream! {
            let mut inner = client
                .chat()
                .create_stream(request)
                .await
                .map_err(|e| SvarError::OpenAI(format!("Completion API error: {}", e)))?;

            while let Some(item) = inner.next().await {
                let chunk = item
                    .map_err(|e| SvarError::Generation(format!("Stream error: {}", e)))?;

                if let Some(fragment) = chunk
                    .choices
                    .first()
                    .and_then(|c| c.delta.content.clone())
                {
                    if !fragment.is_empty() {
                        yield fragment;
                    }
                }
            }

            debug!("Completion stream exhausted");
        };

        Ok(Box::pin(stream))
    }
}
