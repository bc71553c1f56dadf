use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, InlineData, Part};
use crate::ai::{ImageGenerationService, SourceImage};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ImageRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: ImageGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageGenerationConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

pub struct GeminiImageClient {
    http: GeminiHttpClient,
}

impl GeminiImageClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(
                api_key,
                model,
                Duration::from_secs(120),
                client,
            ),
        }
    }
}

#[cfg(test)]
super::impl_with_gemini_base_url!(GeminiImageClient);

/// First inline image among the first candidate's parts.
///
/// Text parts that come along with the image are logged and skipped.
fn first_inline_image(response: &GenerateContentResponse) -> Option<&InlineData> {
    let parts = response.candidates.first()?.content.as_ref()?.parts.iter();
    for part in parts {
        match part {
            Part::Text { text } => tracing::info!("Gemini text response: {}", text),
            Part::InlineData { inline_data } => return Some(inline_data),
            Part::Other(_) => {}
        }
    }
    None
}

#[async_trait]
impl ImageGenerationService for GeminiImageClient {
    async fn generate_image(&self, prompt: &str, source: &SourceImage) -> Result<Vec<u8>> {
        let request = ImageRequest {
            contents: vec![Content {
                role: None,
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: source.mime_type.clone(),
                            data: base64::engine::general_purpose::STANDARD.encode(&source.bytes),
                        },
                    },
                ],
            }],
            generation_config: ImageGenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
                image_config: Some(ImageConfig {
                    aspect_ratio: "1:1".to_string(),
                }),
            },
        };

        tracing::info!("Generating image with Gemini ({})", self.http.model());
        let gemini_response: GenerateContentResponse = self.http.generate_content(&request).await?;

        let image_data = first_inline_image(&gemini_response).ok_or_else(|| {
            let finish_reason = gemini_response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone())
                .unwrap_or_else(|| "unknown".to_string());
            Error::AiProvider(format!(
                "No image generated in Gemini response (finish reason: {})",
                finish_reason
            ))
        })?;

        tracing::debug!(
            "Gemini returned image with mime_type: {}",
            image_data.mime_type
        );

        base64::engine::general_purpose::STANDARD
            .decode(&image_data.data)
            .map_err(|e| Error::AiProvider(format!("Failed to decode Gemini base64 image: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::test_support;
    use wiremock::matchers::{body_string_contains, header};
    use wiremock::{MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";

    fn make_client(server: &MockServer) -> GeminiImageClient {
        GeminiImageClient::new("key".to_string(), DEFAULT_MODEL.to_string())
            .with_base_url(server.uri())
    }

    fn avatar() -> SourceImage {
        SourceImage {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            mime_type: "image/jpeg".to_string(),
        }
    }

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[tokio::test]
    async fn test_selects_inline_part_after_text_part() {
        let server = MockServer::start().await;
        let fake_image = vec![0x89, 0x50, 0x4E, 0x47];

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            { "text": "Here is your portrait!" },
                            { "inlineData": { "mimeType": "image/png", "data": b64(&fake_image) } }
                        ]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let result = make_client(&server)
            .generate_image("a portrait", &avatar())
            .await
            .unwrap();
        assert_eq!(result, fake_image);
    }

    #[tokio::test]
    async fn test_request_carries_prompt_and_source_image() {
        let server = MockServer::start().await;
        let source = avatar();

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(header("x-goog-api-key", "key"))
            .and(body_string_contains("\"text\":\"draw me\""))
            .and(body_string_contains("\"mimeType\":\"image/jpeg\""))
            .and(body_string_contains(b64(&source.bytes).as_str()))
            .and(body_string_contains("\"aspectRatio\":\"1:1\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [{ "inlineData": { "mimeType": "image/png", "data": b64(&[1]) } }]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        make_client(&server)
            .generate_image("draw me", &source)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_text_only_response_is_error() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "I can't draw that" }] },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate_image("a portrait", &avatar())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
        assert!(err.to_string().contains("No image generated"));
    }

    #[tokio::test]
    async fn test_blocked_candidate_without_content_is_error() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "finishReason": "IMAGE_SAFETY" }]
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate_image("a portrait", &avatar())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("IMAGE_SAFETY"));
    }

    #[tokio::test]
    async fn test_api_error_returns_ai_provider_error() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate_image("a portrait", &avatar())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_rejects_invalid_base64() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [{
                            "inlineData": { "mimeType": "image/png", "data": "!!!invalid-base64!!!" }
                        }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let err = make_client(&server)
            .generate_image("a portrait", &avatar())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }
}
