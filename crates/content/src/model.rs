/// Content Catalyst data model
/// Content items, user context, image library and the single-tenant user
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unknown enum value when parsing a kind or status from text
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {what}: '{value}'")]
pub struct ParseKindError {
    pub what: &'static str,
    pub value: String,
}

/// Kind of generated post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Video,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            _ => Err(ParseKindError {
                what: "content type",
                value: s.to_string(),
            }),
        }
    }
}

/// Review lifecycle of a content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    /// Generated, waiting for review
    Pending,
    Approved,
    Rejected,
    /// Has a schedule timestamp
    Scheduled,
    Posted,
    /// Generation still in flight
    Generating,
    /// Generation failed, see `error_message`
    Error,
}

impl ContentStatus {
    pub const ALL: [ContentStatus; 7] = [
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Scheduled,
        Self::Posted,
        Self::Generating,
        Self::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Scheduled => "scheduled",
            Self::Posted => "posted",
            Self::Generating => "generating",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| ParseKindError {
                what: "content status",
                value: s.to_string(),
            })
    }
}

/// Content item identifier: `content-<unix millis>-<batch index>`
///
/// Ids are time-ordered by construction. Items created by one generation
/// request share the millisecond and differ by their position in the batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub String);

impl ContentId {
    pub fn new(created_ms: i64, batch_index: usize) -> Self {
        Self(format!("content-{created_ms}-{batch_index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time in unix millis, 0 when the id is not in canonical form
    pub fn created_ms(&self) -> i64 {
        self.segment(1).unwrap_or(0)
    }

    pub fn batch_index(&self) -> usize {
        self.segment(2).unwrap_or(0)
    }

    fn segment<T: FromStr>(&self, n: usize) -> Option<T> {
        self.0.split('-').nth(n).and_then(|s| s.parse().ok())
    }

    /// Newest first, then prompt order within a batch
    pub fn ordering_key(&self) -> (Reverse<i64>, usize) {
        (Reverse(self.created_ms()), self.batch_index())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A generated social post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: ContentId,

    #[serde(rename = "type")]
    pub kind: ContentType,

    /// Headline the item was generated from
    pub prompt: String,

    /// Text body, or image/video URI. Empty until resolved.
    pub data: String,

    pub status: ContentStatus,

    /// Set exactly when status is `Scheduled`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Serialized provider job handle, present only while a video job is outstanding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_job_id: Option<String>,
}

impl ContentItem {
    /// New item in `Generating` with an empty payload
    pub fn generating(id: ContentId, kind: ContentType, prompt: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            prompt: prompt.into(),
            data: String::new(),
            status: ContentStatus::Generating,
            schedule: None,
            error_message: None,
            generation_job_id: None,
        }
    }

    /// Overwrite the status. Any status other than `Scheduled` drops the schedule.
    pub fn set_status(&mut self, status: ContentStatus) {
        self.status = status;
        if status != ContentStatus::Scheduled {
            self.schedule = None;
        }
    }

    /// Set the schedule and force `Scheduled`, whatever the prior status.
    pub fn set_schedule(&mut self, at: DateTime<Utc>) {
        self.schedule = Some(at);
        self.status = ContentStatus::Scheduled;
    }

    /// Store the finished payload and hand the item over for review
    pub fn resolve(&mut self, data: impl Into<String>) {
        self.data = data.into();
        self.status = ContentStatus::Pending;
        self.error_message = None;
        self.generation_job_id = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.status = ContentStatus::Error;
        self.error_message = Some(if message.trim().is_empty() {
            "An unknown generation error occurred.".to_string()
        } else {
            message
        });
        self.generation_job_id = None;
    }

    /// In flight with a provider job that has to be polled
    pub fn awaits_job(&self) -> bool {
        self.status == ContentStatus::Generating && self.generation_job_id.is_some()
    }
}

/// Sort a collection newest first by creation id
pub fn sort_newest_first(items: &mut [ContentItem]) {
    items.sort_by_key(|item| item.id.ordering_key());
}

/// True while any item is still generating; drives refresh polling
pub fn has_outstanding_jobs(items: &[ContentItem]) -> bool {
    items
        .iter()
        .any(|item| item.status == ContentStatus::Generating)
}

/// Free-text notes and links the headlines are synthesized from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub notes: String,
    pub links: String,
}

impl UserContext {
    pub fn new(notes: impl Into<String>, links: impl Into<String>) -> Self {
        Self {
            notes: notes.into(),
            links: links.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.trim().is_empty() && self.links.trim().is_empty()
    }
}

/// Reference image in the user's library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserImage {
    pub id: String,

    /// Display name, usually the uploaded file name
    pub name: String,

    /// Resolved payload (data URL). Empty until the upload completes.
    #[serde(default)]
    pub url: String,
}

impl UserImage {
    pub fn is_uploaded(&self) -> bool {
        !self.url.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}
