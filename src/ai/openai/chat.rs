use super::client::OpenAiHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage};
use crate::ai::{ChatCompletion, ChatPrompt, ChatService};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct OpenAiChatClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: OpenAiHttpClient::new_with_client(api_key, Duration::from_secs(60), client),
            model,
        }
    }
}

#[cfg(test)]
super::impl_with_openai_base_url!(OpenAiChatClient);

#[async_trait]
impl ChatService for OpenAiChatClient {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<ChatCompletion> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(&prompt.system),
                ChatMessage::user(&prompt.user),
            ],
            max_completion_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
        };

        tracing::debug!(
            "Calling OpenAI chat completions (model: {}, max_tokens: {})",
            self.model,
            prompt.max_tokens
        );

        let response = self.http.chat_completion(&request).await?;
        let usage = response.usage;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::AiProvider("No response from OpenAI chat API".to_string()))?;

        let content = choice
            .message
            .content
            .ok_or_else(|| Error::AiProvider("OpenAI chat response had no content".to_string()))?;

        Ok(ChatCompletion {
            content: content.trim().to_string(),
            finish_reason: choice.finish_reason,
            usage,
        })
    }
}
