//! Application orchestration for the upload → describe → caption flow.

use crate::ai::{
    mime, ChatService, DescriptionService, GeminiChatClient, HuggingFaceDescriptionClient,
    OpenAiChatClient, OpenAiVisionClient,
};
use crate::captions::CaptionComposer;
use crate::exchange::{ResultExchange, SessionStatus};
use crate::models::{CaptionProvider, CaptionRequest, Config, DescriptionProvider, FeedbackRequest};
use crate::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Description used when the real one failed or did not arrive in time.
pub const PLACEHOLDER_DESCRIPTION: &str = "No description available.";

/// Timing and storage knobs for the request flow.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub result_wait: Duration,
    pub result_poll: Duration,
    pub session_ttl: Duration,
    pub session_sweep: Duration,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            result_wait: Duration::from_secs(10),
            result_poll: Duration::from_secs(1),
            session_ttl: Duration::from_secs(600),
            session_sweep: Duration::from_secs(60),
            upload_dir: std::env::temp_dir(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl From<&Config> for AppSettings {
    fn from(config: &Config) -> Self {
        Self {
            result_wait: config.result_wait,
            result_poll: config.result_poll,
            session_ttl: config.session_ttl,
            session_sweep: config.session_sweep,
            upload_dir: config.upload_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub describer: Arc<dyn DescriptionService>,
    pub chat: Arc<dyn ChatService>,
}

/// An accepted upload and the background task describing it.
pub struct UploadTicket {
    pub uid: String,
    pub task: JoinHandle<()>,
}

/// Coordinates image description, the result hand-off, and caption writing.
#[derive(Clone)]
pub struct App {
    describer: Arc<dyn DescriptionService>,
    composer: CaptionComposer,
    exchange: ResultExchange,
    settings: Arc<AppSettings>,
}

impl App {
    /// Build an app from concrete service dependencies.
    pub fn with_services(services: AppServices, settings: AppSettings) -> Self {
        Self {
            describer: services.describer,
            composer: CaptionComposer::new(services.chat),
            exchange: ResultExchange::new(),
            settings: Arc::new(settings),
        }
    }

    fn required_key(key: &Option<String>, name: &str) -> Result<String> {
        key.clone()
            .ok_or_else(|| Error::Config(format!("{} not set", name)))
    }

    /// Construct an app from environment-derived configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        // Reuse one HTTP connection pool across provider clients.
        let http_client = reqwest::Client::new();

        let chat: Arc<dyn ChatService> = match config.caption_provider {
            CaptionProvider::OpenAi => {
                info!("Caption provider: OpenAI (model: {})", config.caption_model);
                Arc::new(OpenAiChatClient::new_with_client(
                    Self::required_key(&config.openai_api_key, "OPENAI_API_KEY")?,
                    config.caption_model.clone(),
                    http_client.clone(),
                ))
            }
            CaptionProvider::Gemini => {
                info!("Caption provider: Gemini (model: {})", config.caption_model);
                Arc::new(GeminiChatClient::new_with_client(
                    Self::required_key(&config.gemini_api_key, "GEMINI_API_KEY")?,
                    config.caption_model.clone(),
                    http_client.clone(),
                ))
            }
        };

        let describer: Arc<dyn DescriptionService> = match config.description_provider {
            DescriptionProvider::HuggingFace => {
                info!(
                    "Description provider: Hugging Face (model: {})",
                    config.description_model
                );
                Arc::new(HuggingFaceDescriptionClient::new_with_client(
                    Self::required_key(&config.hf_token, "HF_TOKEN")?,
                    config.description_model.clone(),
                    http_client,
                ))
            }
            DescriptionProvider::OpenAi => {
                info!(
                    "Description provider: OpenAI (model: {})",
                    config.description_model
                );
                Arc::new(OpenAiVisionClient::new_with_client(
                    Self::required_key(&config.openai_api_key, "OPENAI_API_KEY")?,
                    config.description_model.clone(),
                    http_client,
                ))
            }
        };

        std::fs::create_dir_all(&config.upload_dir)?;

        Ok(Self::with_services(
            AppServices { describer, chat },
            AppSettings::from(config),
        ))
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn exchange(&self) -> &ResultExchange {
        &self.exchange
    }

    /// Validate and store an uploaded image, then start describing it in the
    /// background.
    pub async fn accept_upload(&self, bytes: Vec<u8>) -> Result<UploadTicket> {
        if bytes.is_empty() {
            return Err(Error::Upload("The uploaded file is empty.".to_string()));
        }
        if bytes.len() > self.settings.max_upload_bytes {
            return Err(Error::Upload(format!(
                "The uploaded file is too large (limit is {} bytes).",
                self.settings.max_upload_bytes
            )));
        }
        let kind = mime::sniff_image(&bytes).ok_or_else(|| {
            Error::Upload(
                "Please upload a JPEG, PNG, WebP, GIF or BMP image.".to_string(),
            )
        })?;

        let uid = Uuid::new_v4().to_string();
        let upload_dir = self.settings.upload_dir.clone();
        let prefix = format!("upload_{}_", uid);
        let suffix = format!(".{}", kind.extension);

        let temp_file = tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
            use std::io::Write;
            let mut file = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(&suffix)
                .tempfile_in(upload_dir)?;
            file.write_all(&bytes)?;
            file.flush()?;
            Ok(file)
        })
        .await
        .map_err(|e| Error::Invariant(format!("Upload write task join error: {}", e)))??;

        info!(
            "Accepted upload {} ({}) at {}",
            uid,
            kind.mime,
            temp_file.path().display()
        );

        self.exchange.begin(&uid);
        let task = tokio::spawn(describe_in_background(
            self.describer.clone(),
            self.exchange.clone(),
            uid.clone(),
            temp_file,
        ));

        Ok(UploadTicket { uid, task })
    }

    pub fn status(&self, uid: &str) -> SessionStatus {
        self.exchange.status(uid)
    }

    /// Wait for the description of `uid` and write a caption from it.
    ///
    /// A missing description degrades to [`PLACEHOLDER_DESCRIPTION`] instead
    /// of failing the request.
    pub async fn generate_caption(
        &self,
        uid: &str,
        location: &str,
        tone: &str,
        additional_context: &str,
    ) -> String {
        let description = match self
            .exchange
            .take(uid, self.settings.result_wait, self.settings.result_poll)
            .await
        {
            Some(description) => description,
            None => {
                warn!("No description for session {}; using placeholder", uid);
                PLACEHOLDER_DESCRIPTION.to_string()
            }
        };

        let request = CaptionRequest::new(description)
            .with_location(location)
            .with_tone(tone)
            .with_additional_context(additional_context);

        self.composer.compose_caption(&request).await
    }

    pub async fn alternatives(&self, request: &FeedbackRequest) -> Vec<String> {
        self.composer.compose_alternatives(request).await
    }

    /// Periodically drop sessions nobody consumed.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let exchange = self.exchange.clone();
        let ttl = self.settings.session_ttl;
        let period = self.settings.session_sweep.max(Duration::from_secs(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                exchange.sweep_expired(ttl);
            }
        })
    }
}

/// Describe the stored upload, release the temp file, and publish the result.
async fn describe_in_background(
    describer: Arc<dyn DescriptionService>,
    exchange: ResultExchange,
    uid: String,
    temp_file: NamedTempFile,
) {
    info!("[{}] Describing image", uid);

    let description = match describer.describe(temp_file.path()).await {
        Ok(description) => {
            info!("[{}] Description ready ({} chars)", uid, description.len());
            description
        }
        Err(e) => {
            error!("[{}] Image description failed: {}", uid, e);
            PLACEHOLDER_DESCRIPTION.to_string()
        }
    };

    let path = temp_file.path().to_path_buf();
    if let Err(e) = temp_file.close() {
        warn!("[{}] Failed to remove {}: {}", uid, path.display(), e);
    }

    exchange.put(&uid, description);
}
