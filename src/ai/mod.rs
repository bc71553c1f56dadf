//! AI service integration for question text and portrait generation
//!
//! OpenAI chat completions produce the raw question list; Gemini turns a
//! source photo plus a prompt into a portrait image.

pub mod gemini;
pub mod mime;
pub mod mock;
pub mod openai;

pub use gemini::GeminiImageClient;
pub use mock::{MockChatClient, MockImageGenerationClient};
pub use openai::OpenAiChatClient;

use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// One system + user exchange sent to a chat model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

/// Token accounting reported by the chat provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Raw text reply of a chat completion, before any parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl ChatCompletion {
    /// True when the provider stopped because it hit the token cap.
    pub fn hit_length_limit(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

/// Image handed to the image model as conditioning input.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[async_trait]
pub trait ChatService: Send + Sync {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<ChatCompletion>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    async fn generate_image(&self, prompt: &str, source: &SourceImage) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_length_limit() {
        let truncated = ChatCompletion {
            content: "[{".to_string(),
            finish_reason: Some("length".to_string()),
            usage: None,
        };
        assert!(truncated.hit_length_limit());

        let complete = ChatCompletion {
            finish_reason: Some("stop".to_string()),
            ..truncated.clone()
        };
        assert!(!complete.hit_length_limit());
        assert!(!ChatCompletion::default().hit_length_limit());
    }
}
