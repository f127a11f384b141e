/// Repository interface over the content store
///
/// Each aggregate (user, context, images, content items) is read and written
/// on its own. Every call is atomic with respect to other calls on the same
/// repository.
use crate::error::Result;
use crate::model::{ContentId, ContentItem, ContentStatus, User, UserContext, UserImage};

pub trait ContentRepository: Send + Sync {
    fn user(&self) -> Result<Option<User>>;

    /// Replace the single-tenant user; `None` clears it
    fn set_user(&self, user: Option<&User>) -> Result<()>;

    fn context(&self) -> Result<UserContext>;

    fn save_context(&self, context: &UserContext) -> Result<()>;

    /// Images in insertion order
    fn list_images(&self) -> Result<Vec<UserImage>>;

    fn get_image(&self, id: &str) -> Result<Option<UserImage>>;

    fn insert_image(&self, image: &UserImage) -> Result<()>;

    /// Store the resolved payload. Returns the updated image, `None` if missing.
    fn update_image_url(&self, id: &str, url: &str) -> Result<Option<UserImage>>;

    fn delete_image(&self, id: &str) -> Result<bool>;

    /// Content items, newest first
    fn list_content(&self) -> Result<Vec<ContentItem>>;

    fn get_content(&self, id: &ContentId) -> Result<Option<ContentItem>>;

    /// Insert a whole generation batch in one write
    fn insert_content(&self, items: &[ContentItem]) -> Result<()>;

    /// Read-modify-write a single item. Returns the stored result, `None` if missing.
    fn update_content(
        &self,
        id: &ContentId,
        apply: &mut dyn FnMut(&mut ContentItem),
    ) -> Result<Option<ContentItem>>;

    fn delete_content(&self, id: &ContentId) -> Result<bool>;

    /// Apply polled job outcomes in one write. Each outcome only lands if its
    /// item is still waiting on the same job. Returns how many were applied.
    fn apply_job_outcomes(&self, outcomes: &[JobOutcome]) -> Result<usize>;
}

/// Terminal result of polling a provider job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResolution {
    /// Finished; `data` is the composed payload locator
    Completed { data: String },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub id: ContentId,
    /// Job reference the poll was issued with
    pub job_ref: String,
    pub resolution: JobResolution,
}

impl JobOutcome {
    pub fn completed(id: ContentId, job_ref: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id,
            job_ref: job_ref.into(),
            resolution: JobResolution::Completed { data: data.into() },
        }
    }

    pub fn failed(id: ContentId, job_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            job_ref: job_ref.into(),
            resolution: JobResolution::Failed {
                message: message.into(),
            },
        }
    }

    /// Compare-and-set against the stored item. False when the item moved on.
    pub fn apply_to(&self, item: &mut ContentItem) -> bool {
        if item.id != self.id
            || item.status != ContentStatus::Generating
            || item.generation_job_id.as_deref() != Some(self.job_ref.as_str())
        {
            return false;
        }
        match &self.resolution {
            JobResolution::Completed { data } => item.resolve(data.clone()),
            JobResolution::Failed { message } => item.fail(message.clone()),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContentType;

    fn video(job: &str) -> ContentItem {
        let mut item = ContentItem::generating(ContentId::new(5, 0), ContentType::Video, "p");
        item.generation_job_id = Some(job.to_string());
        item
    }

    #[test]
    fn test_outcome_applies_to_matching_job() {
        let mut item = video("op-1");
        let outcome = JobOutcome::completed(item.id.clone(), "op-1", "https://v/1");
        assert!(outcome.apply_to(&mut item));
        assert_eq!(item.status, ContentStatus::Pending);
        assert_eq!(item.data, "https://v/1");
        assert!(item.generation_job_id.is_none());
    }

    #[test]
    fn test_outcome_skips_item_that_moved_on() {
        let mut item = video("op-1");
        item.set_status(ContentStatus::Rejected);
        let outcome = JobOutcome::failed(item.id.clone(), "op-1", "boom");
        assert!(!outcome.apply_to(&mut item));
        assert_eq!(item.status, ContentStatus::Rejected);

        let mut other = video("op-2");
        assert!(!outcome.apply_to(&mut other));
        assert_eq!(other.status, ContentStatus::Generating);
    }
}
