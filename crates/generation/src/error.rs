use content::StoreError;
use thiserror::Error;

/// Failure reported by an upstream generation backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        ProviderError::Configuration(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        ProviderError::Transport(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        ProviderError::InvalidResponse(msg.into())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(format!("request failed: {err}"))
    }
}

/// Errors surfaced by the content service
#[derive(Debug, Error)]
pub enum CatalystError {
    /// Headline synthesis failed; no items were created
    #[error("{0}")]
    SynthesisFailed(String),

    /// A single item failed. Recorded on the item, never returned for a whole batch.
    #[error("{0}")]
    ItemGenerationFailed(String),

    /// Polling a video job failed. Recorded on the item.
    #[error("{0}")]
    JobPollFailed(String),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("not authenticated")]
    Unauthorized,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalystError {
    pub fn content_not_found(id: impl Into<String>) -> Self {
        CatalystError::NotFound {
            what: "content item",
            id: id.into(),
        }
    }

    pub fn image_not_found(id: impl Into<String>) -> Self {
        CatalystError::NotFound {
            what: "image",
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalystError>;
