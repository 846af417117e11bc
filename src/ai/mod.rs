//! AI service integration for image description and caption writing
//!
//! Describes uploaded photos through an image-to-text provider (Hugging Face
//! Inference or OpenAI vision) and writes captions through a chat provider
//! (OpenAI or Gemini).

pub mod gemini;
pub(crate) mod http;
pub mod huggingface;
pub mod mime;
pub mod mock;
pub mod openai;

pub use gemini::GeminiChatClient;
pub use huggingface::HuggingFaceDescriptionClient;
pub use mock::{MockChatClient, MockDescriptionClient};
pub use openai::{OpenAiChatClient, OpenAiVisionClient};

use crate::models::{CaptionRequest, FeedbackRequest};
use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// Turns an image on disk into a natural-language description.
#[async_trait]
pub trait DescriptionService: Send + Sync {
    async fn describe(&self, image_path: &Path) -> Result<String>;
}

/// Text generation for captions and caption alternatives.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Returns the caption text as written by the model.
    async fn generate_caption(&self, request: &CaptionRequest) -> Result<String>;

    /// Returns the raw model reply, one suggestion per line.
    async fn generate_alternatives(&self, request: &FeedbackRequest) -> Result<String>;
}
