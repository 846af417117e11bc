use super::types::GenerateContentResponse;
use crate::ai::http::read_json;
use crate::Result;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Caller for the Gemini `generateContent` endpoint of a single model.
pub struct GeminiHttpClient {
    client: Client,
    api_key: String,
    endpoint_model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiHttpClient {
    /// `model` may be given with or without the `models/` prefix.
    pub fn new_with_client(api_key: String, model: &str, timeout: Duration, client: Client) -> Self {
        Self {
            client,
            api_key,
            endpoint_model: model.trim_start_matches("models/").to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.endpoint_model
        )
    }

    pub async fn generate_content<Req: Serialize>(
        &self,
        request: &Req,
    ) -> Result<GenerateContentResponse> {
        tracing::debug!("Calling Gemini generateContent ({})", self.endpoint_model);

        let response = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .inspect_err(|e| tracing::error!("Gemini request failed to send: {}", e))?;

        read_json("Gemini", response).await
    }
}
