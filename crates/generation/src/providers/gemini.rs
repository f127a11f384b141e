/// Gemini REST API backend
///
/// Text and image go through `generateContent`; video is a long-running
/// `predictLongRunning` operation polled by name.
use super::{
    compose_locator, BackendConfig, BackendType, GenerationBackend, HeadlineRequest, VideoJob,
    VideoJobStatus, VideoRequest,
};
use crate::error::ProviderError;
use crate::media::InlineImage;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini API backend
pub struct GeminiBackend {
    api_key: String,
    api_base: String,
    config: BackendConfig,
    client: reqwest::Client,
}

impl GeminiBackend {
    /// Create new Gemini backend
    pub fn new(config: BackendConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ProviderError::configuration("Gemini backend requires api_key"))?
            .to_string();
        let api_base = config
            .api_url
            .as_deref()
            .unwrap_or(GEMINI_API_BASE)
            .trim_end_matches('/')
            .to_string();

        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(20));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|err| ProviderError::configuration(format!("HTTP client setup failed: {err}")))?;

        Ok(Self {
            api_key,
            api_base,
            config,
            client,
        })
    }

    fn model_endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.api_base, model.trim(), method)
    }

    async fn post_json(&self, url: &str, payload: &Value) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(payload)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let msg = format!("Gemini API error: {status} - {body}");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::Authentication(msg)
                }
                StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(msg),
                _ => ProviderError::Transport(msg),
            });
        }
        response
            .json()
            .await
            .map_err(|err| ProviderError::invalid_response(format!("Invalid Gemini response JSON: {err}")))
    }

    async fn generate_content(&self, model: &str, payload: Value) -> Result<GeminiCandidate, ProviderError> {
        let body = self
            .post_json(&self.model_endpoint(model, "generateContent"), &payload)
            .await?;
        let parsed: GeminiResponse = serde_json::from_value(body).map_err(|err| {
            ProviderError::invalid_response(format!("Unexpected Gemini response shape: {err}"))
        })?;
        parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::invalid_response("Gemini response had no candidates."))
    }
}

#[async_trait::async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Gemini
    }

    async fn generate_headlines(
        &self,
        request: &HeadlineRequest,
    ) -> Result<Vec<String>, ProviderError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" }
                }
            }
        });
        let candidate = self.generate_content(&self.config.text_model, payload).await?;
        let text = candidate.text();
        serde_json::from_str::<Vec<String>>(text.trim()).map_err(|err| {
            ProviderError::invalid_response(format!(
                "Expected a JSON array of strings: {err}; raw: {text}"
            ))
        })
    }

    async fn generate_image(
        &self,
        prompt: &str,
        seed: Option<&InlineImage>,
    ) -> Result<Option<InlineImage>, ProviderError> {
        let mut parts = Vec::new();
        if let Some(seed) = seed {
            parts.push(json!({
                "inlineData": {
                    "mimeType": seed.mime_type,
                    "data": seed.base64_data(),
                }
            }));
        }
        parts.push(json!({ "text": prompt }));
        let payload = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "responseModalities": ["IMAGE"] }
        });
        let candidate = self.generate_content(&self.config.image_model, payload).await?;
        let image = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .find_map(|part| part.inline_data)
            .and_then(|data| InlineImage::from_base64(data.mime_type, &data.data));
        Ok(image)
    }

    async fn submit_video(&self, request: &VideoRequest) -> Result<VideoJob, ProviderError> {
        let body = self
            .post_json(
                &self.model_endpoint(&self.config.video_model, "predictLongRunning"),
                &video_payload(request),
            )
            .await?;
        let name = body
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::invalid_response("Video submission returned no operation name."))?;
        tracing::debug!("submitted video operation {name}");
        Ok(VideoJob::new(name))
    }

    async fn poll_video(&self, job: &VideoJob) -> Result<VideoJobStatus, ProviderError> {
        let response = self
            .client
            .get(format!("{}/v1beta/{}", self.api_base, job.name))
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        let body = Self::read_json(response).await?;
        let operation: Operation = serde_json::from_value(body).map_err(|err| {
            ProviderError::invalid_response(format!("Unexpected operation shape: {err}"))
        })?;
        Ok(operation.into_status())
    }

    fn authorize_locator(&self, uri: &str) -> String {
        compose_locator(uri, &self.api_key)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl GeminiCandidate {
    fn text(&self) -> String {
        self.content
            .as_ref()
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    done: bool,
    response: Option<OperationResponse>,
    error: Option<OperationError>,
}

impl Operation {
    fn into_status(self) -> VideoJobStatus {
        if !self.done {
            return VideoJobStatus::Running;
        }
        if let Some(error) = self.error {
            return VideoJobStatus::Failed {
                code: error.code,
                message: error.message,
            };
        }
        let uri = self
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri);
        VideoJobStatus::Succeeded { uri }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<GeneratedVideo>,
}

#[derive(Debug, Deserialize)]
struct GeneratedVideo {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Body of a `predictLongRunning` video request
fn video_payload(request: &VideoRequest) -> Value {
    let mut instance = json!({ "prompt": request.prompt });
    if let Some(seed) = &request.seed {
        instance["image"] = json!({
            "bytesBase64Encoded": seed.base64_data(),
            "mimeType": seed.mime_type,
        });
    }
    json!({
        "instances": [instance],
        "parameters": {
            "aspectRatio": request.options.aspect_ratio,
            "resolution": request.options.resolution,
            "sampleCount": request.options.sample_count,
        }
    })
}
