use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::ai::http::read_json;
use crate::Result;
use reqwest::Client;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Authenticated `chat/completions` caller shared by the chat and vision clients.
pub struct OpenAiHttpClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiHttpClient {
    pub fn new_with_client(api_key: String, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        tracing::debug!("Sending chat completion request to OpenAI ({})", request.model);

        let response = self
            .client
            .post(format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH))
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .inspect_err(|e| tracing::error!("OpenAI request failed to send: {}", e))?;

        read_json("OpenAI", response).await
    }
}
