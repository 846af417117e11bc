use super::client::GeminiHttpClient;
use super::types::Content;
use crate::ai::ChatService;
use crate::models::{CaptionRequest, FeedbackRequest};
use crate::prompts::{self, SamplingParams};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest {
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: Option<ChatGenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

pub struct GeminiChatClient {
    http: GeminiHttpClient,
}

impl GeminiChatClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(
                api_key,
                &model,
                Duration::from_secs(30),
                client,
            ),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    async fn complete(&self, system: &str, user: String, params: SamplingParams) -> Result<String> {
        let request = ChatRequest {
            system_instruction: Some(Content::from_text(None, system)),
            contents: vec![Content::from_text(Some("user"), user)],
            generation_config: Some(ChatGenerationConfig {
                max_output_tokens: Some(params.max_tokens),
                temperature: Some(params.temperature),
            }),
        };

        let response = self.http.generate_content(&request).await?;

        response
            .first_text()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::AiProvider("No text in Gemini response".to_string()))
    }
}

#[async_trait]
impl ChatService for GeminiChatClient {
    async fn generate_caption(&self, request: &CaptionRequest) -> Result<String> {
        self.complete(
            prompts::CAPTION_SYSTEM,
            prompts::caption_prompt(request),
            prompts::CAPTION_PARAMS,
        )
        .await
    }

    async fn generate_alternatives(&self, request: &FeedbackRequest) -> Result<String> {
        self.complete(
            prompts::ALTERNATIVES_SYSTEM,
            prompts::alternatives_prompt(request),
            prompts::ALTERNATIVES_PARAMS,
        )
        .await
    }
}
