/// Request and response bodies for the REST API
use chrono::{DateTime, Utc};
use content::{ContentStatus, UserImage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: String,

    /// Mime type of the file about to be uploaded
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    /// Where to PUT the payload
    pub upload_url: String,
    pub new_image: UserImage,
}

#[derive(Debug, Deserialize)]
pub struct UploadDataRequest {
    /// Resolved payload, a data URL
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ContentStatus,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub schedule: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OutstandingResponse {
    pub outstanding: bool,
}
