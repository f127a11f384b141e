/// Content Catalyst generation orchestration
///
/// Headline synthesis, per-item fan-out over a generation backend, video job
/// reconciliation and the service facade the binaries talk to.
pub mod config;
pub mod error;
pub mod fanout;
pub mod media;
pub mod providers;
pub mod reconcile;
pub mod refresh;
pub mod service;
pub mod synthesizer;

pub use config::CatalystConfig;
pub use error::{CatalystError, ProviderError, Result};
pub use media::InlineImage;
pub use providers::{
    BackendConfig, BackendFactory, BackendType, GeminiBackend, GenerationBackend, MockBackend,
    VideoJob, VideoJobStatus, VideoOptions,
};
pub use refresh::RefreshMonitor;
pub use service::{ContentService, GenerationRequest, ServiceSettings};
