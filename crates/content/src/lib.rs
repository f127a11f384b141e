pub mod db;
pub mod error;
pub mod ids;
pub mod memory;
pub mod model;
pub mod repository;

use std::path::PathBuf;

pub use db::ContentDb;
pub use error::{Result, StoreError};
pub use ids::IdClock;
pub use memory::MemoryStore;
pub use model::{
    has_outstanding_jobs, sort_newest_first, ContentId, ContentItem, ContentStatus, ContentType,
    ParseKindError, User, UserContext, UserImage,
};
pub use repository::{ContentRepository, JobOutcome, JobResolution};

pub fn app_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
    base.join("content_catalyst")
}
