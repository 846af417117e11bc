//! Data models and structures
//!
//! Defines the request value objects passed to the caption services and the
//! runtime configuration loaded from the environment.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Inputs for a single caption generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptionRequest {
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub additional_context: String,
}

impl CaptionRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = context.into();
        self
    }
}

/// Inputs for the alternative-suggestions round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub final_caption: String,
    pub feedback: String,
    #[serde(default)]
    pub direction: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionProvider {
    OpenAi,
    Gemini,
}

impl CaptionProvider {
    pub fn default_model(self) -> &'static str {
        match self {
            CaptionProvider::OpenAi => "gpt-3.5-turbo",
            CaptionProvider::Gemini => "gemini-2.5-flash",
        }
    }
}

impl FromStr for CaptionProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(CaptionProvider::OpenAi),
            "gemini" => Ok(CaptionProvider::Gemini),
            other => Err(Error::Config(format!(
                "Unknown CAPTION_PROVIDER '{}'. Expected 'openai' or 'gemini'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionProvider {
    HuggingFace,
    OpenAi,
}

impl DescriptionProvider {
    pub fn default_model(self) -> &'static str {
        match self {
            DescriptionProvider::HuggingFace => "Salesforce/blip-image-captioning-large",
            DescriptionProvider::OpenAi => "gpt-4o-mini",
        }
    }
}

impl FromStr for DescriptionProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(DescriptionProvider::HuggingFace),
            "openai" => Ok(DescriptionProvider::OpenAi),
            other => Err(Error::Config(format!(
                "Unknown DESCRIPTION_PROVIDER '{}'. Expected 'huggingface' or 'openai'",
                other
            ))),
        }
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub caption_provider: CaptionProvider,
    pub caption_model: String,
    pub description_provider: DescriptionProvider,
    pub description_model: String,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub hf_token: Option<String>,
    pub result_wait: Duration,
    pub result_poll: Duration,
    pub session_ttl: Duration,
    pub session_sweep: Duration,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, validating that every
    /// credential the selected providers need is present.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let caption_provider: CaptionProvider = match get("CAPTION_PROVIDER") {
            Some(value) => value.parse()?,
            None => CaptionProvider::OpenAi,
        };
        let description_provider: DescriptionProvider = match get("DESCRIPTION_PROVIDER") {
            Some(value) => value.parse()?,
            None => DescriptionProvider::HuggingFace,
        };

        let openai_api_key = get("OPENAI_API_KEY");
        let gemini_api_key = get("GEMINI_API_KEY");
        let hf_token = get("HF_TOKEN");

        let needs_openai = caption_provider == CaptionProvider::OpenAi
            || description_provider == DescriptionProvider::OpenAi;
        if needs_openai && openai_api_key.is_none() {
            return Err(Error::Config("OPENAI_API_KEY not set".to_string()));
        }
        if caption_provider == CaptionProvider::Gemini && gemini_api_key.is_none() {
            return Err(Error::Config("GEMINI_API_KEY not set".to_string()));
        }
        if description_provider == DescriptionProvider::HuggingFace && hf_token.is_none() {
            return Err(Error::Config("HF_TOKEN not set".to_string()));
        }

        Ok(Self {
            caption_provider,
            caption_model: get("CAPTION_MODEL")
                .unwrap_or_else(|| caption_provider.default_model().to_string()),
            description_provider,
            description_model: get("DESCRIPTION_MODEL")
                .unwrap_or_else(|| description_provider.default_model().to_string()),
            openai_api_key,
            gemini_api_key,
            hf_token,
            result_wait: Duration::from_secs(parse_bounded(&get, "RESULT_WAIT_SECS", 10, MAX_WAIT_SECS)?),
            result_poll: Duration::from_millis(parse_bounded(
                &get,
                "RESULT_POLL_MS",
                1000,
                MAX_WAIT_SECS * 1000,
            )?),
            session_ttl: Duration::from_secs(parse_bounded(&get, "SESSION_TTL_SECS", 600, MAX_SESSION_SECS)?),
            session_sweep: Duration::from_secs(parse_bounded(
                &get,
                "SESSION_SWEEP_SECS",
                60,
                MAX_SESSION_SECS,
            )?),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            max_upload_bytes: parse_bounded(
                &get,
                "MAX_UPLOAD_BYTES",
                10 * 1024 * 1024,
                MAX_UPLOAD_BYTES,
            )?,
            static_dir: get("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
        })
    }
}

/// Upper bounds for numeric settings.
const MAX_WAIT_SECS: u64 = 60 * 60;
const MAX_SESSION_SECS: u64 = 7 * 24 * 60 * 60;
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

fn parse_bounded<T, F>(get: &F, key: &str, default: T, max: T) -> Result<T>
where
    T: FromStr + PartialOrd + std::fmt::Display,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, key, default)?;
    if value > max {
        return Err(Error::Config(format!(
            "{} is {} but may be at most {}",
            key, value, max
        )));
    }
    Ok(value)
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}
