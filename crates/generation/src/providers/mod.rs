/// Generation backends abstraction
///
/// Provides a unified interface over the upstream model APIs:
/// - Gemini REST API (text, image, long-running video jobs)
/// - Scripted mock (tests and offline runs)
pub mod gemini;
pub mod mock;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use gemini::GeminiBackend;
pub use mock::MockBackend;

use crate::error::ProviderError;
use crate::media::InlineImage;

/// Backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Google Gemini REST API
    Gemini,
    /// Deterministic in-process backend
    Mock,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

impl FromStr for BackendType {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            other => Err(ProviderError::configuration(format!(
                "unknown backend '{other}'"
            ))),
        }
    }
}

/// Request for a JSON array of short headlines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlineRequest {
    pub prompt: String,
    pub count: usize,
}

/// Shape options for video jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOptions {
    pub aspect_ratio: String,
    pub resolution: String,
    /// Videos rendered per job; only the first is used
    pub sample_count: u32,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: "1:1".to_string(),
            resolution: "720p".to_string(),
            sample_count: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub prompt: String,
    pub options: VideoOptions,
    pub seed: Option<InlineImage>,
}

/// Handle to a long-running video job.
///
/// Serialized into the content item's job reference and parsed back when polled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoJob {
    pub name: String,
}

impl VideoJob {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn to_job_ref(&self) -> String {
        serde_json::json!({ "name": self.name }).to_string()
    }

    pub fn from_job_ref(job_ref: &str) -> Result<Self, ProviderError> {
        serde_json::from_str(job_ref).map_err(|err| {
            ProviderError::invalid_response(format!("unreadable job reference '{job_ref}': {err}"))
        })
    }
}

/// Status of a polled video job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoJobStatus {
    Running,
    /// Done. `uri` is absent when the operation produced no sample.
    Succeeded { uri: Option<String> },
    Failed { code: i64, message: String },
}

/// Generation backend trait
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Backend type
    fn backend_type(&self) -> BackendType;

    /// Ask for headlines as a JSON array of strings
    async fn generate_headlines(&self, request: &HeadlineRequest)
        -> Result<Vec<String>, ProviderError>;

    /// Generate one image. `Ok(None)` when the response carried no image data.
    async fn generate_image(
        &self,
        prompt: &str,
        seed: Option<&InlineImage>,
    ) -> Result<Option<InlineImage>, ProviderError>;

    /// Submit a video job without waiting for it
    async fn submit_video(&self, request: &VideoRequest) -> Result<VideoJob, ProviderError>;

    async fn poll_video(&self, job: &VideoJob) -> Result<VideoJobStatus, ProviderError>;

    /// Turn a result URI into a fetchable locator
    fn authorize_locator(&self, uri: &str) -> String {
        uri.to_string()
    }
}

/// Append the API key as a `key` query parameter
pub fn compose_locator(uri: &str, api_key: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{uri}{separator}key={api_key}")
}

/// Backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend type
    pub backend_type: BackendType,

    /// API base URL; the public endpoint when unset
    pub api_url: Option<String>,

    /// API key or token
    pub api_key: Option<String>,

    pub text_model: String,
    pub image_model: String,
    pub video_model: String,

    pub video: VideoOptions,

    /// Timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(BackendType::Gemini)
    }
}

impl BackendConfig {
    /// Create new backend config
    pub fn new(backend_type: BackendType) -> Self {
        Self {
            backend_type,
            api_url: None,
            api_key: None,
            text_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            video_model: "veo-3.1-fast-generate-preview".to_string(),
            video: VideoOptions::default(),
            timeout_secs: Some(120),
        }
    }

    /// With API endpoint
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// With API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// With timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// Backend factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    /// Create backend from config
    pub fn create(config: BackendConfig) -> Result<Arc<dyn GenerationBackend>, ProviderError> {
        match config.backend_type {
            BackendType::Gemini => {
                let backend = GeminiBackend::new(config)?;
                Ok(Arc::new(backend))
            }
            BackendType::Mock => {
                let mut backend = MockBackend::new();
                if let Some(key) = config.api_key {
                    backend = backend.with_api_key(key);
                }
                Ok(Arc::new(backend))
            }
        }
    }
}
