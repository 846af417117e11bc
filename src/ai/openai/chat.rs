use super::client::OpenAiHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage};
use crate::ai::ChatService;
use crate::models::{CaptionRequest, FeedbackRequest};
use crate::prompts::{self, SamplingParams};
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
            http: OpenAiHttpClient::new_with_client(api_key, Duration::from_secs(30), client),
            model,
        }
    }

    async fn complete(&self, system: &str, user: String, params: SamplingParams) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::text("system", system),
                ChatMessage::text("user", user),
            ],
            max_completion_tokens: params.max_tokens,
            temperature: Some(params.temperature),
        };

        let response = self.http.chat_completion(&request).await?;

        response
            .first_text()
            .ok_or_else(|| Error::AiProvider("No response from OpenAI chat API".to_string()))
    }
}

#[cfg(test)]
super::impl_with_openai_base_url!(OpenAiChatClient);

#[async_trait]
impl ChatService for OpenAiChatClient {
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
