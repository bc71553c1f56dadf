use super::{ChatCompletion, ChatPrompt, ChatService, ImageGenerationService, SourceImage};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Scripted chat model. Replies cycle through the configured completions.
#[derive(Clone)]
pub struct MockChatClient {
    responses: Arc<Mutex<Vec<ChatCompletion>>>,
    failure: Option<String>,
    prompts: Arc<Mutex<Vec<ChatPrompt>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Queue a reply that finished normally.
    pub fn with_response(self, content: &str) -> Self {
        self.with_completion(ChatCompletion {
            content: content.to_string(),
            finish_reason: Some("stop".to_string()),
            usage: None,
        })
    }

    pub fn with_completion(self, completion: ChatCompletion) -> Self {
        self.responses.lock().unwrap().push(completion);
        self
    }

    /// Fail every call as if the upstream API returned an error.
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn get_prompts(&self) -> Vec<ChatPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatClient {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<ChatCompletion> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        self.prompts.lock().unwrap().push(prompt.clone());

        if let Some(message) = &self.failure {
            return Err(Error::AiProvider(message.clone()));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(ChatCompletion {
                content: "[]".to_string(),
                finish_reason: Some("stop".to_string()),
                usage: None,
            })
        } else {
            let index = (*count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

/// Scripted image model recording every prompt and source image it receives.
#[derive(Clone)]
pub struct MockImageGenerationClient {
    image_responses: Arc<Mutex<Vec<Vec<u8>>>>,
    failure: Option<String>,
    requests: Arc<Mutex<Vec<(String, SourceImage)>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            image_responses: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_image_response(self, response: Vec<u8>) -> Self {
        self.image_responses.lock().unwrap().push(response);
        self
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn get_requests(&self) -> Vec<(String, SourceImage)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_image(&self, prompt: &str, source: &SourceImage) -> Result<Vec<u8>> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        self.requests
            .lock()
            .unwrap()
            .push((prompt.to_string(), source.clone()));

        if let Some(message) = &self.failure {
            return Err(Error::AiProvider(message.clone()));
        }

        let responses = self.image_responses.lock().unwrap();
        if responses.is_empty() {
            // Tiny valid PNG
            Ok(vec![
                0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49,
                0x48, 0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02,
                0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44,
                0x41, 0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00,
                0x01, 0xE2, 0x25, 0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44,
                0xAE, 0x42, 0x60, 0x82,
            ])
        } else {
            let index = (*count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}
