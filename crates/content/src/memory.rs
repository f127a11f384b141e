use crate::error::Result;
use crate::model::{sort_newest_first, ContentId, ContentItem, User, UserContext, UserImage};
use crate::repository::{ContentRepository, JobOutcome};
use parking_lot::RwLock;

/// In-process store. Used by tests and by the server when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    user: RwLock<Option<User>>,
    context: RwLock<UserContext>,
    images: RwLock<Vec<UserImage>>,
    content: RwLock<Vec<ContentItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: User) -> Self {
        let store = Self::default();
        *store.user.write() = Some(user);
        store
    }
}

impl ContentRepository for MemoryStore {
    fn user(&self) -> Result<Option<User>> {
        Ok(self.user.read().clone())
    }

    fn set_user(&self, user: Option<&User>) -> Result<()> {
        *self.user.write() = user.cloned();
        Ok(())
    }

    fn context(&self) -> Result<UserContext> {
        Ok(self.context.read().clone())
    }

    fn save_context(&self, context: &UserContext) -> Result<()> {
        *self.context.write() = context.clone();
        Ok(())
    }

    fn list_images(&self) -> Result<Vec<UserImage>> {
        Ok(self.images.read().clone())
    }

    fn get_image(&self, id: &str) -> Result<Option<UserImage>> {
        Ok(self.images.read().iter().find(|img| img.id == id).cloned())
    }

    fn insert_image(&self, image: &UserImage) -> Result<()> {
        self.images.write().push(image.clone());
        Ok(())
    }

    fn update_image_url(&self, id: &str, url: &str) -> Result<Option<UserImage>> {
        let mut images = self.images.write();
        Ok(images.iter_mut().find(|img| img.id == id).map(|img| {
            img.url = url.to_string();
            img.clone()
        }))
    }

    fn delete_image(&self, id: &str) -> Result<bool> {
        let mut images = self.images.write();
        let before = images.len();
        images.retain(|img| img.id != id);
        Ok(images.len() != before)
    }

    fn list_content(&self) -> Result<Vec<ContentItem>> {
        Ok(self.content.read().clone())
    }

    fn get_content(&self, id: &ContentId) -> Result<Option<ContentItem>> {
        Ok(self.content.read().iter().find(|item| &item.id == id).cloned())
    }

    fn insert_content(&self, items: &[ContentItem]) -> Result<()> {
        let mut content = self.content.write();
        content.extend_from_slice(items);
        sort_newest_first(&mut content);
        Ok(())
    }

    fn update_content(
        &self,
        id: &ContentId,
        apply: &mut dyn FnMut(&mut ContentItem),
    ) -> Result<Option<ContentItem>> {
        let mut content = self.content.write();
        Ok(content.iter_mut().find(|item| &item.id == id).map(|item| {
            apply(item);
            item.clone()
        }))
    }

    fn delete_content(&self, id: &ContentId) -> Result<bool> {
        let mut content = self.content.write();
        let before = content.len();
        content.retain(|item| &item.id != id);
        Ok(content.len() != before)
    }

    fn apply_job_outcomes(&self, outcomes: &[JobOutcome]) -> Result<usize> {
        let mut content = self.content.write();
        let mut applied = 0;
        for outcome in outcomes {
            if let Some(item) = content.iter_mut().find(|item| item.id == outcome.id) {
                if outcome.apply_to(item) {
                    applied += 1;
                }
            }
        }
        Ok(applied)
    }
}
