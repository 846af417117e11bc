use super::client::OpenAiHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage};
use crate::ai::DescriptionService;
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Image description through an OpenAI vision-capable chat model.
pub struct OpenAiVisionClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiVisionClient {
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
super::impl_with_openai_base_url!(OpenAiVisionClient);

#[async_trait]
impl DescriptionService for OpenAiVisionClient {
    async fn describe(&self, image_path: &Path) -> Result<String> {
        let image_bytes = tokio::fs::read(image_path).await?;
        tracing::debug!(
            "Describing {} ({} bytes) with OpenAI",
            image_path.display(),
            image_bytes.len()
        );

        use base64::Engine as _;
        let base64_image = base64::engine::general_purpose::STANDARD.encode(&image_bytes);
        let mime = crate::ai::mime::detect_image_mime(&image_bytes);
        let data_url = format!("data:{};base64,{}", mime, base64_image);

        let user_message = ChatMessage::with_image("user", prompts::DESCRIBE_USER.trim(), data_url);

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![user_message],
            max_completion_tokens: 300,
            temperature: None,
        };

        let response = self.http.chat_completion(&request).await?;

        response
            .first_text()
            .ok_or_else(|| Error::AiProvider("No description from OpenAI vision".to_string()))
    }
}
