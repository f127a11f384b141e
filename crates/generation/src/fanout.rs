use crate::error::{CatalystError, Result};
use crate::media::InlineImage;
use crate::providers::{GenerationBackend, VideoOptions, VideoRequest};
use content::{ContentId, ContentItem, ContentType};
use futures::future::join_all;
use std::sync::Arc;

const NO_IMAGE_DATA: &str = "No image data returned from API.";

/// Generates one content item per headline, concurrently.
///
/// A failing item ends up in `error` state with its message; siblings are unaffected.
#[derive(Clone)]
pub struct ItemGenerator {
    backend: Arc<dyn GenerationBackend>,
    video: VideoOptions,
}

impl ItemGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, video: VideoOptions) -> Self {
        Self { backend, video }
    }

    /// Items come back in headline order
    pub async fn generate_all(
        &self,
        kind: ContentType,
        batch: Vec<(ContentId, String)>,
        seed: Option<&InlineImage>,
    ) -> Vec<ContentItem> {
        let jobs = batch
            .into_iter()
            .map(|(id, prompt)| self.generate_one(ContentItem::generating(id, kind, prompt), seed));
        join_all(jobs).await
    }

    async fn generate_one(&self, mut item: ContentItem, seed: Option<&InlineImage>) -> ContentItem {
        if let Err(err) = self.run(&mut item, seed).await {
            tracing::warn!("generation of {} ({}) failed: {err}", item.id, item.kind);
            item.fail(err.to_string());
        }
        item
    }

    async fn run(&self, item: &mut ContentItem, seed: Option<&InlineImage>) -> Result<()> {
        match item.kind {
            ContentType::Text => {
                let text = item.prompt.clone();
                item.resolve(text);
            }
            ContentType::Image => {
                let prompt = image_prompt(&item.prompt, seed.is_some());
                let image = self
                    .backend
                    .generate_image(&prompt, seed)
                    .await
                    .map_err(|err| CatalystError::ItemGenerationFailed(err.to_string()))?
                    .ok_or_else(|| CatalystError::ItemGenerationFailed(NO_IMAGE_DATA.to_string()))?;
                item.resolve(image.to_data_url());
            }
            ContentType::Video => {
                let request = VideoRequest {
                    prompt: video_prompt(&item.prompt),
                    options: self.video.clone(),
                    seed: seed.cloned(),
                };
                let job = self
                    .backend
                    .submit_video(&request)
                    .await
                    .map_err(|err| CatalystError::ItemGenerationFailed(err.to_string()))?;
                tracing::debug!("{} waiting on {}", item.id, job.name);
                item.generation_job_id = Some(job.to_job_ref());
            }
        }
        Ok(())
    }
}

pub fn image_prompt(headline: &str, seeded: bool) -> String {
    if seeded {
        format!("Overlay the following text onto this image in a stylish and readable way: \"{headline}\"")
    } else {
        format!(
            "Generate a visually appealing social media graphic. The graphic should prominently \
             feature the text: \"{headline}\". Make the style modern, clean, and engaging."
        )
    }
}

pub fn video_prompt(headline: &str) -> String {
    format!(
        "A short, looping motion graphic for social media with the text \"{headline}\" overlaid. \
         The style should be dynamic and eye-catching."
    )
}
