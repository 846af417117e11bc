use super::{ChatService, DescriptionService};
use crate::models::{CaptionRequest, FeedbackRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
pub struct MockDescriptionClient {
    responses: Arc<Mutex<Vec<String>>>,
    seen_paths: Arc<Mutex<Vec<PathBuf>>>,
    call_count: Arc<Mutex<usize>>,
    delay: Duration,
    fail: bool,
}

impl MockDescriptionClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            seen_paths: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn with_description(self, description: String) -> Self {
        self.responses.lock().unwrap().push(description);
        self
    }

    /// Sleep before answering, to stand in for a slow provider.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Image paths passed to `describe`, in call order.
    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen_paths.lock().unwrap().clone()
    }
}

impl Default for MockDescriptionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DescriptionService for MockDescriptionClient {
    async fn describe(&self, image_path: &Path) -> Result<String> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.seen_paths
            .lock()
            .unwrap()
            .push(image_path.to_path_buf());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail {
            return Err(Error::AiProvider("mock description failure".to_string()));
        }

        // The real providers read the file, so a missing one fails here too.
        if !image_path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", image_path.display()),
            )));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("a photo".to_string())
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

#[derive(Clone)]
pub struct MockChatClient {
    caption_responses: Arc<Mutex<Vec<String>>>,
    alternatives_responses: Arc<Mutex<Vec<String>>>,
    caption_requests: Arc<Mutex<Vec<CaptionRequest>>>,
    call_count: Arc<Mutex<usize>>,
    fail: bool,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self {
            caption_responses: Arc::new(Mutex::new(Vec::new())),
            alternatives_responses: Arc::new(Mutex::new(Vec::new())),
            caption_requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            fail: false,
        }
    }

    pub fn with_caption_response(self, response: String) -> Self {
        self.caption_responses.lock().unwrap().push(response);
        self
    }

    pub fn with_alternatives_response(self, response: String) -> Self {
        self.alternatives_responses.lock().unwrap().push(response);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Caption requests received so far, in call order.
    pub fn caption_requests(&self) -> Vec<CaptionRequest> {
        self.caption_requests.lock().unwrap().clone()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatService for MockChatClient {
    async fn generate_caption(&self, request: &CaptionRequest) -> Result<String> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };
        self.caption_requests.lock().unwrap().push(request.clone());

        if self.fail {
            return Err(Error::AiProvider("mock chat failure".to_string()));
        }

        let responses = self.caption_responses.lock().unwrap();
        if responses.is_empty() {
            // Default mock response
            Ok(format!("Caption for {}", request.description))
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }

    async fn generate_alternatives(&self, request: &FeedbackRequest) -> Result<String> {
        let count = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            *count
        };

        if self.fail {
            return Err(Error::AiProvider("mock chat failure".to_string()));
        }

        let responses = self.alternatives_responses.lock().unwrap();
        if responses.is_empty() {
            Ok(format!(
                "{} reimagined\n{} with a twist\n{} once more",
                request.final_caption, request.final_caption, request.final_caption
            ))
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_chat_default_caption_mentions_description() {
        let client = MockChatClient::new();
        let caption = client
            .generate_caption(&CaptionRequest::new("a dog"))
            .await
            .unwrap();
        assert!(caption.contains("a dog"));
        assert_eq!(client.caption_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_chat_custom_responses_cycle() {
        let client = MockChatClient::new()
            .with_caption_response("Caption 1".to_string())
            .with_caption_response("Caption 2".to_string());

        let request = CaptionRequest::new("x");
        assert_eq!(client.generate_caption(&request).await.unwrap(), "Caption 1");
        assert_eq!(client.generate_caption(&request).await.unwrap(), "Caption 2");
        // Should cycle back
        assert_eq!(client.generate_caption(&request).await.unwrap(), "Caption 1");
        assert_eq!(client.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_chat_failing() {
        let client = MockChatClient::new().failing();
        let err = client
            .generate_alternatives(&FeedbackRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));
    }

    #[tokio::test]
    async fn test_mock_description_requires_existing_file() {
        let client = MockDescriptionClient::new().with_description("a beach".to_string());
        let file = tempfile::NamedTempFile::new().unwrap();

        assert_eq!(client.describe(file.path()).await.unwrap(), "a beach");
        let missing = file.path().with_extension("gone");
        assert!(client.describe(&missing).await.is_err());
        assert_eq!(client.get_call_count(), 2);
        assert_eq!(client.seen_paths()[0], file.path());
    }
}
