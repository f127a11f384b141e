use super::{
    compose_locator, BackendType, GenerationBackend, HeadlineRequest, VideoJob, VideoJobStatus,
    VideoRequest,
};
use crate::error::ProviderError;
use crate::media::InlineImage;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Scripted in-process backend.
///
/// Headlines default to numbered placeholders, images to a 1x1 PNG, and video
/// jobs stay running until finished or failed through the script handles.
#[derive(Default)]
pub struct MockBackend {
    api_key: Option<String>,
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    headlines: Option<Vec<String>>,
    headline_error: Option<String>,
    failing_prompts: Vec<String>,
    omit_image_data: bool,
    poll_error: Option<String>,
    jobs: HashMap<String, VideoJobStatus>,
    next_job: u64,
    headline_prompts: Vec<String>,
    image_calls: Vec<(String, Option<String>)>,
    video_calls: Vec<VideoRequest>,
    polls: u64,
}

const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Reply to headline requests with exactly these strings
    pub fn with_headlines<I, S>(self, headlines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().headlines = Some(headlines.into_iter().map(Into::into).collect());
        self
    }

    pub fn failing_headlines(self, message: impl Into<String>) -> Self {
        self.state.lock().headline_error = Some(message.into());
        self
    }

    /// Image and video calls whose prompt contains `needle` fail
    pub fn failing_prompts_containing(self, needle: impl Into<String>) -> Self {
        self.state.lock().failing_prompts.push(needle.into());
        self
    }

    pub fn without_image_data(self) -> Self {
        self.state.lock().omit_image_data = true;
        self
    }

    pub fn set_poll_error(&self, message: Option<&str>) {
        self.state.lock().poll_error = message.map(str::to_string);
    }

    pub fn finish_job(&self, name: &str, uri: Option<&str>) {
        self.state.lock().jobs.insert(
            name.to_string(),
            VideoJobStatus::Succeeded {
                uri: uri.map(str::to_string),
            },
        );
    }

    pub fn fail_job(&self, name: &str, code: i64, message: &str) {
        self.state.lock().jobs.insert(
            name.to_string(),
            VideoJobStatus::Failed {
                code,
                message: message.to_string(),
            },
        );
    }

    /// Names of submitted jobs, in submission order
    pub fn job_names(&self) -> Vec<String> {
        let state = self.state.lock();
        (1..=state.next_job).map(job_name).collect()
    }

    pub fn headline_prompts(&self) -> Vec<String> {
        self.state.lock().headline_prompts.clone()
    }

    /// `(prompt, seed mime type)` per image call
    pub fn image_calls(&self) -> Vec<(String, Option<String>)> {
        self.state.lock().image_calls.clone()
    }

    pub fn video_calls(&self) -> Vec<VideoRequest> {
        self.state.lock().video_calls.clone()
    }

    pub fn poll_count(&self) -> u64 {
        self.state.lock().polls
    }

    fn check_prompt(state: &MockState, prompt: &str) -> Result<(), ProviderError> {
        match state.failing_prompts.iter().find(|needle| prompt.contains(needle.as_str())) {
            Some(needle) => Err(ProviderError::transport(format!(
                "mock failure for prompt containing '{needle}'"
            ))),
            None => Ok(()),
        }
    }
}

fn job_name(n: u64) -> String {
    format!("operations/mock-{n}")
}

#[async_trait::async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &str {
        "Mock"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Mock
    }

    async fn generate_headlines(
        &self,
        request: &HeadlineRequest,
    ) -> Result<Vec<String>, ProviderError> {
        let mut state = self.state.lock();
        state.headline_prompts.push(request.prompt.clone());
        if let Some(message) = &state.headline_error {
            return Err(ProviderError::transport(message.clone()));
        }
        Ok(state.headlines.clone().unwrap_or_else(|| {
            (1..=request.count)
                .map(|n| format!("Placeholder headline {n}"))
                .collect()
        }))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        seed: Option<&InlineImage>,
    ) -> Result<Option<InlineImage>, ProviderError> {
        let mut state = self.state.lock();
        state
            .image_calls
            .push((prompt.to_string(), seed.map(|s| s.mime_type.clone())));
        Self::check_prompt(&state, prompt)?;
        if state.omit_image_data {
            return Ok(None);
        }
        Ok(InlineImage::from_base64("image/png", PIXEL_PNG))
    }

    async fn submit_video(&self, request: &VideoRequest) -> Result<VideoJob, ProviderError> {
        let mut state = self.state.lock();
        state.video_calls.push(request.clone());
        Self::check_prompt(&state, &request.prompt)?;
        state.next_job += 1;
        let name = job_name(state.next_job);
        state.jobs.insert(name.clone(), VideoJobStatus::Running);
        Ok(VideoJob::new(name))
    }

    async fn poll_video(&self, job: &VideoJob) -> Result<VideoJobStatus, ProviderError> {
        let mut state = self.state.lock();
        state.polls += 1;
        if let Some(message) = &state.poll_error {
            return Err(ProviderError::transport(message.clone()));
        }
        state
            .jobs
            .get(&job.name)
            .cloned()
            .ok_or_else(|| ProviderError::invalid_response(format!("unknown operation {}", job.name)))
    }

    fn authorize_locator(&self, uri: &str) -> String {
        match &self.api_key {
            Some(key) => compose_locator(uri, key),
            None => uri.to_string(),
        }
    }
}
