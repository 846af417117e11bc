//! Hugging Face Inference API image-to-text client
//!
//! Sends raw image bytes to a hosted captioning model (BLIP by default) and
//! normalises the handful of response shapes the API is known to return.

use super::DescriptionService;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;

const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/hf-inference";
const MODEL_LOADING_RETRIES: usize = 2;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageToTextOutput {
    Many(Vec<ImageToTextItem>),
    One(ImageToTextItem),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageToTextItem {
    Text(String),
    Generated {
        generated_text: Option<String>,
        image_to_text_output_generated_text: Option<String>,
    },
}

impl ImageToTextItem {
    fn into_text(self) -> Option<String> {
        match self {
            ImageToTextItem::Text(text) => Some(text),
            ImageToTextItem::Generated {
                generated_text,
                image_to_text_output_generated_text,
            } => generated_text.or(image_to_text_output_generated_text),
        }
    }
}

impl ImageToTextOutput {
    fn into_text(self) -> Option<String> {
        match self {
            ImageToTextOutput::Many(items) => items.into_iter().next()?.into_text(),
            ImageToTextOutput::One(item) => item.into_text(),
        }
    }
}

/// A failed attempt, tagged with whether another try could succeed.
struct Attempt {
    error: Error,
    retryable: bool,
}

impl From<Error> for Attempt {
    fn from(error: Error) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

pub struct HuggingFaceDescriptionClient {
    client: Client,
    token: String,
    model: String,
    base_url: String,
    retry_delay: Duration,
}

impl HuggingFaceDescriptionClient {
    pub fn new(token: String, model: String) -> Self {
        Self::new_with_client(token, model, Client::new())
    }

    pub fn new_with_client(token: String, model: String, client: Client) -> Self {
        Self {
            client,
            token,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry_delay: Duration::from_secs(2),
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    async fn request_once(&self, image_bytes: &[u8]) -> std::result::Result<String, Attempt> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(60))
            .bearer_auth(&self.token)
            .header(
                reqwest::header::CONTENT_TYPE,
                super::mime::detect_image_mime(image_bytes),
            )
            .body(image_bytes.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Hugging Face: {}", e);
                Error::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.map_err(Error::from)?;
            return Err(Attempt {
                error: super::http::status_error("Hugging Face", status, &error_text),
                retryable: status == StatusCode::SERVICE_UNAVAILABLE,
            });
        }

        let body = response.text().await.map_err(Error::from)?;
        let output: ImageToTextOutput = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Hugging Face response: {}\nBody: {}", e, body);
            Error::AiProvider(format!("Failed to parse Hugging Face response: {}", e))
        })?;

        output
            .into_text()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                Error::AiProvider("No generated text in Hugging Face response".to_string()).into()
            })
    }
}

#[async_trait]
impl DescriptionService for HuggingFaceDescriptionClient {
    async fn describe(&self, image_path: &Path) -> Result<String> {
        let image_bytes = tokio::fs::read(image_path).await?;
        tracing::debug!(
            "Describing {} ({} bytes) with {}",
            image_path.display(),
            image_bytes.len(),
            self.model
        );

        let image_bytes = &image_bytes;
        let strategy = FixedInterval::new(self.retry_delay).take(MODEL_LOADING_RETRIES);
        RetryIf::start(
            strategy,
            move || self.request_once(image_bytes),
            |attempt: &Attempt| {
                if attempt.retryable {
                    tracing::warn!("Model {} is still loading. Will retry...", self.model);
                }
                attempt.retryable
            },
        )
        .await
        .map_err(|attempt| attempt.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "Salesforce/blip-image-captioning-large";

    fn png_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
            .unwrap();
        file
    }

    fn make_client(server: &MockServer) -> HuggingFaceDescriptionClient {
        HuggingFaceDescriptionClient::new("hf-token".to_string(), MODEL.to_string())
            .with_base_url(server.uri())
            .with_retry_delay(Duration::from_millis(10))
    }

    async fn describe_with(body: serde_json::Value) -> Result<String> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let file = png_file();
        make_client(&server).describe(file.path()).await
    }

    #[tokio::test]
    async fn test_describe_sends_bytes_with_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .and(header("Authorization", "Bearer hf-token"))
            .and(header("Content-Type", "image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "generated_text": "  arafed dog on a beach  " }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let file = png_file();
        let description = make_client(&server).describe(file.path()).await.unwrap();
        assert_eq!(description, "arafed dog on a beach");
    }

    #[tokio::test]
    async fn test_describe_accepts_single_object() {
        let text = describe_with(serde_json::json!({ "generated_text": "a red bicycle" }))
            .await
            .unwrap();
        assert_eq!(text, "a red bicycle");
    }

    #[tokio::test]
    async fn test_describe_accepts_list_of_strings() {
        let text = describe_with(serde_json::json!(["a mountain lake"]))
            .await
            .unwrap();
        assert_eq!(text, "a mountain lake");
    }

    #[tokio::test]
    async fn test_describe_accepts_bare_string() {
        let text = describe_with(serde_json::json!("city skyline at night"))
            .await
            .unwrap();
        assert_eq!(text, "city skyline at night");
    }

    #[tokio::test]
    async fn test_describe_accepts_long_field_name() {
        let text = describe_with(serde_json::json!([
            { "image_to_text_output_generated_text": "two cats asleep" }
        ]))
        .await
        .unwrap();
        assert_eq!(text, "two cats asleep");
    }

    #[tokio::test]
    async fn test_describe_rejects_empty_output() {
        let err = describe_with(serde_json::json!([])).await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));

        let err = describe_with(serde_json::json!([{ "generated_text": "   " }]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_describe_retries_while_model_loads() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "generated_text": "a lighthouse" }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let file = png_file();
        let description = make_client(&server).describe(file.path()).await.unwrap();
        assert_eq!(description, "a lighthouse");
    }

    #[tokio::test]
    async fn test_describe_gives_up_after_retries() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
            .expect(3)
            .mount(&server)
            .await;

        let file = png_file();
        let err = make_client(&server).describe(file.path()).await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_describe_does_not_retry_auth_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(format!("/models/{}", MODEL)))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .expect(1)
            .mount(&server)
            .await;

        let file = png_file();
        let err = make_client(&server).describe(file.path()).await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }
}
