/// REST API endpoints for content catalyst
/// Handles auth identity, context, image library and content lifecycle
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use content::{has_outstanding_jobs, ContentId, ContentItem, User, UserContext, UserImage};
use generation::{CatalystError, ContentService, GenerationRequest};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::models::*;

pub type AppState = Arc<ContentService>;

/// API error type
pub struct ApiError(CatalystError);

impl From<CatalystError> for ApiError {
    fn from(err: CatalystError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CatalystError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CatalystError::Unauthorized => StatusCode::UNAUTHORIZED,
            CatalystError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalystError::SynthesisFailed(_)
            | CatalystError::ItemGenerationFailed(_)
            | CatalystError::JobPollFailed(_)
            | CatalystError::Provider(_) => StatusCode::BAD_GATEWAY,
            CatalystError::Store(_) | CatalystError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        }

        let message = self.0.to_string();
        (status, Json(json!({ "error": message, "message": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/api/auth/me", get(current_user))
        .route("/api/data/context", get(get_context).post(save_context))
        .route("/api/images", get(list_images))
        .route("/api/images/upload-url", post(request_upload_url))
        .route("/api/images/:id/data", put(complete_upload))
        .route("/api/images/:id", delete(delete_image))
        .route("/api/content", get(list_content))
        .route("/api/content/outstanding", get(outstanding))
        .route("/api/content/generate", post(generate))
        .route("/api/content/:id", delete(delete_content))
        .route("/api/content/:id/status", patch(set_status))
        .route("/api/content/:id/schedule", patch(set_schedule))
        // CORS for local development
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(service)
}

/// GET /api/auth/me - Current user
pub async fn current_user(State(service): State<AppState>) -> ApiResult<Json<User>> {
    Ok(Json(service.current_user()?))
}

/// GET /api/data/context
pub async fn get_context(State(service): State<AppState>) -> ApiResult<Json<UserContext>> {
    Ok(Json(service.get_context()?))
}

/// POST /api/data/context - Replace notes and links
pub async fn save_context(
    State(service): State<AppState>,
    Json(context): Json<UserContext>,
) -> ApiResult<Json<UserContext>> {
    service.save_context(&context)?;
    Ok(Json(context))
}

/// GET /api/images
pub async fn list_images(State(service): State<AppState>) -> ApiResult<Json<Vec<UserImage>>> {
    Ok(Json(service.list_images()?))
}

/// POST /api/images/upload-url - Register an image and hand out its upload target
pub async fn request_upload_url(
    State(service): State<AppState>,
    Json(req): Json<UploadUrlRequest>,
) -> ApiResult<Json<UploadUrlResponse>> {
    let image = service.register_image(&req.file_name)?;
    tracing::debug!(
        "upload slot {} for {} ({})",
        image.id,
        image.name,
        req.content_type.as_deref().unwrap_or("unknown type")
    );
    Ok(Json(UploadUrlResponse {
        upload_url: format!("/api/images/{}/data", image.id),
        new_image: image,
    }))
}

/// PUT /api/images/:id/data - Store the uploaded payload
pub async fn complete_upload(
    State(service): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UploadDataRequest>,
) -> ApiResult<Json<UserImage>> {
    Ok(Json(service.complete_upload(&id, &req.url)?))
}

/// DELETE /api/images/:id
pub async fn delete_image(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    service.delete_image(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/content - Reconcile video jobs, then list newest first
pub async fn list_content(State(service): State<AppState>) -> ApiResult<Json<Vec<ContentItem>>> {
    Ok(Json(service.list_content().await?))
}

/// GET /api/content/outstanding - Whether a refresh is still needed
pub async fn outstanding(State(service): State<AppState>) -> ApiResult<Json<OutstandingResponse>> {
    let items = service.list_content().await?;
    Ok(Json(OutstandingResponse {
        outstanding: has_outstanding_jobs(&items),
    }))
}

/// POST /api/content/generate
pub async fn generate(
    State(service): State<AppState>,
    Json(req): Json<GenerationRequest>,
) -> ApiResult<Json<Vec<ContentItem>>> {
    Ok(Json(service.generate(req).await?))
}

/// DELETE /api/content/:id
pub async fn delete_content(
    State(service): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    service.delete_content(&ContentId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/content/:id/status
pub async fn set_status(
    State(service): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<ContentItem>> {
    Ok(Json(service.set_status(&ContentId(id), req.status)?))
}

/// PATCH /api/content/:id/schedule
pub async fn set_schedule(
    State(service): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ScheduleRequest>,
) -> ApiResult<Json<ContentItem>> {
    Ok(Json(service.set_schedule(&ContentId(id), req.schedule)?))
}
