use crate::config::CatalystConfig;
use crate::error::{CatalystError, Result};
use crate::fanout::ItemGenerator;
use crate::media::InlineImage;
use crate::providers::{BackendFactory, GenerationBackend, VideoOptions};
use crate::reconcile::{apply_in_memory, JobReconciler};
use crate::synthesizer::PromptSynthesizer;
use chrono::{DateTime, Utc};
use content::{
    sort_newest_first, ContentDb, ContentId, ContentItem, ContentRepository, ContentStatus,
    ContentType, IdClock, MemoryStore, User, UserContext, UserImage,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Notify;

/// A request for a batch of generated posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(rename = "type")]
    pub kind: ContentType,

    /// Context to synthesize from; the stored context when absent
    #[serde(default)]
    pub context: Option<UserContext>,

    pub count: usize,

    /// Library image to seed image/video generation with
    #[serde(default)]
    pub start_image_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(kind: ContentType, count: usize) -> Self {
        Self {
            kind,
            context: None,
            count,
            start_image_id: None,
        }
    }

    pub fn with_context(mut self, context: UserContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_start_image(mut self, image_id: impl Into<String>) -> Self {
        self.start_image_id = Some(image_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub max_items_per_request: usize,
    pub video: VideoOptions,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_items_per_request: 5,
            video: VideoOptions::default(),
        }
    }
}

/// Content store plus generation orchestration
pub struct ContentService {
    store: Arc<dyn ContentRepository>,
    backend: Arc<dyn GenerationBackend>,
    synthesizer: PromptSynthesizer,
    generator: ItemGenerator,
    reconciler: JobReconciler,
    ids: IdClock,
    settings: ServiceSettings,
    changes: Arc<Notify>,
}

impl ContentService {
    pub fn new(
        store: Arc<dyn ContentRepository>,
        backend: Arc<dyn GenerationBackend>,
        settings: ServiceSettings,
    ) -> Result<Self> {
        let newest = newest_issued_millis(store.as_ref())?;
        Ok(Self {
            synthesizer: PromptSynthesizer::new(backend.clone()),
            generator: ItemGenerator::new(backend.clone(), settings.video.clone()),
            reconciler: JobReconciler::new(backend.clone()),
            ids: IdClock::starting_after(newest),
            store,
            backend,
            settings,
            changes: Arc::new(Notify::new()),
        })
    }

    /// Open the configured store and backend, registering the configured user
    pub fn from_config(config: &CatalystConfig) -> Result<Self> {
        let store: Arc<dyn ContentRepository> = if config.in_memory {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(ContentDb::open_or_create(&config.db_path())?)
        };
        if let Some(user) = &config.user {
            store.set_user(Some(user))?;
        }
        let backend = BackendFactory::create(config.backend.clone())?;
        tracing::info!(
            "content service ready (backend: {}, store: {})",
            backend.name(),
            if config.in_memory { "memory".to_string() } else { config.db_path().display().to_string() }
        );
        Self::new(
            store,
            backend,
            ServiceSettings {
                max_items_per_request: config.max_items_per_request,
                video: config.backend.video.clone(),
            },
        )
    }

    pub fn backend(&self) -> Arc<dyn GenerationBackend> {
        Arc::clone(&self.backend)
    }

    /// Signalled after every generation request
    pub fn change_notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.changes)
    }

    pub fn current_user(&self) -> Result<User> {
        self.store.user()?.ok_or(CatalystError::Unauthorized)
    }

    pub fn set_user(&self, user: Option<&User>) -> Result<()> {
        Ok(self.store.set_user(user)?)
    }

    pub fn get_context(&self) -> Result<UserContext> {
        Ok(self.store.context()?)
    }

    pub fn save_context(&self, context: &UserContext) -> Result<()> {
        Ok(self.store.save_context(context)?)
    }

    pub fn list_images(&self) -> Result<Vec<UserImage>> {
        Ok(self.store.list_images()?)
    }

    /// Create an image entry awaiting its payload
    pub fn register_image(&self, name: &str) -> Result<UserImage> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalystError::InvalidRequest("image name is required".to_string()));
        }
        let image = UserImage {
            id: self.ids.image_id(),
            name: name.to_string(),
            url: String::new(),
        };
        self.store.insert_image(&image)?;
        tracing::info!("registered image {} ({})", image.id, image.name);
        Ok(image)
    }

    pub fn complete_upload(&self, id: &str, url: &str) -> Result<UserImage> {
        if url.trim().is_empty() {
            return Err(CatalystError::InvalidRequest("image payload is empty".to_string()));
        }
        self.store
            .update_image_url(id, url)?
            .ok_or_else(|| CatalystError::image_not_found(id))
    }

    pub fn delete_image(&self, id: &str) -> Result<()> {
        if self.store.delete_image(id)? {
            Ok(())
        } else {
            Err(CatalystError::image_not_found(id))
        }
    }

    /// Reconcile outstanding video jobs, then return everything newest first
    pub async fn list_content(&self) -> Result<Vec<ContentItem>> {
        let mut items = self.store.list_content()?;
        let outcomes = self.reconciler.poll_outstanding(&items).await;
        if !outcomes.is_empty() {
            match self.store.apply_job_outcomes(&outcomes) {
                Ok(applied) => {
                    tracing::info!("reconciled {applied} of {} finished jobs", outcomes.len());
                    items = self.store.list_content()?;
                }
                Err(err) => {
                    tracing::error!("failed to persist job outcomes: {err}");
                    apply_in_memory(&mut items, &outcomes);
                }
            }
        }
        sort_newest_first(&mut items);
        Ok(items)
    }

    /// Synthesize headlines and generate one item per headline.
    ///
    /// Fails only when the request is invalid or synthesis fails; per-item
    /// failures are recorded on the items.
    pub async fn generate(&self, request: GenerationRequest) -> Result<Vec<ContentItem>> {
        let max = self.settings.max_items_per_request;
        if request.count == 0 || request.count > max {
            return Err(CatalystError::InvalidRequest(format!(
                "count must be between 1 and {max}, got {}",
                request.count
            )));
        }
        let context = match request.context {
            Some(context) => context,
            None => self.store.context()?,
        };
        tracing::info!("generating {} {} item(s)", request.count, request.kind);

        let headlines = self.synthesizer.synthesize(&context, request.count).await?;
        let seed = match (request.kind, request.start_image_id.as_deref()) {
            (ContentType::Text, _) | (_, None) => None,
            (_, Some(image_id)) => self.resolve_seed(image_id)?,
        };

        let ids = self.ids.content_batch(headlines.len());
        let batch = ids.into_iter().zip(headlines).collect();
        let items = self
            .generator
            .generate_all(request.kind, batch, seed.as_ref())
            .await;

        if let Err(err) = self.store.insert_content(&items) {
            tracing::error!("failed to persist {} generated item(s): {err}", items.len());
        }
        self.changes.notify_one();
        Ok(items)
    }

    fn resolve_seed(&self, image_id: &str) -> Result<Option<InlineImage>> {
        let Some(image) = self.store.get_image(image_id)? else {
            tracing::warn!("seed image {image_id} not found, generating unseeded");
            return Ok(None);
        };
        if !image.is_uploaded() {
            tracing::warn!("seed image {image_id} has no payload yet, generating unseeded");
            return Ok(None);
        }
        let seed = InlineImage::from_data_url(&image.url);
        if seed.is_none() {
            tracing::warn!("seed image {image_id} is not an inline data URL, generating unseeded");
        }
        Ok(seed)
    }

    pub fn delete_content(&self, id: &ContentId) -> Result<()> {
        if self.store.delete_content(id)? {
            Ok(())
        } else {
            Err(CatalystError::content_not_found(id.as_str()))
        }
    }

    /// Change an item's status. Scheduling needs a time, so `Scheduled` is
    /// only reachable through [`ContentService::set_schedule`].
    pub fn set_status(&self, id: &ContentId, status: ContentStatus) -> Result<ContentItem> {
        if status == ContentStatus::Scheduled {
            return Err(CatalystError::InvalidRequest(
                "use set_schedule to schedule an item".to_string(),
            ));
        }
        self.store
            .update_content(id, &mut |item| item.set_status(status))?
            .ok_or_else(|| CatalystError::content_not_found(id.as_str()))
    }

    pub fn set_schedule(&self, id: &ContentId, at: DateTime<Utc>) -> Result<ContentItem> {
        self.store
            .update_content(id, &mut |item| item.set_schedule(at))?
            .ok_or_else(|| CatalystError::content_not_found(id.as_str()))
    }
}

/// Newest millisecond already used by a stored content or image id
fn newest_issued_millis(store: &dyn ContentRepository) -> Result<i64> {
    let content = store
        .list_content()?
        .iter()
        .map(|item| item.id.created_ms())
        .max()
        .unwrap_or(0);
    let images = store
        .list_images()?
        .iter()
        .filter_map(|image| image.id.strip_prefix("img-"))
        .filter_map(|ms| ms.parse::<i64>().ok())
        .max()
        .unwrap_or(0);
    Ok(content.max(images))
}
