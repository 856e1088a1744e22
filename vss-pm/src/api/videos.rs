//! Video directory API handlers
//!
//! The directory holds metadata for every video known to the pipeline.
//! Search results reference videos by id; the UI resolves those
//! references against this directory.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use vss_common::{events::VssEvent, models::Video};

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// POST /videos request
#[derive(Debug, Deserialize)]
pub struct RegisterVideoRequest {
    /// Display name of the video
    pub name: String,
    /// Optional playback/location URL
    pub url: Option<String>,
    /// Tags attached to the video
    #[serde(default)]
    pub tags: Vec<String>,
}

/// GET /videos
///
/// List all videos in the directory.
pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<Vec<Video>>> {
    let videos = crate::db::videos::list(&state.db).await?;
    Ok(Json(videos))
}

/// POST /videos
///
/// Register a new video in the directory. Tags are recorded in the tag
/// registry and a VideoAdded event is broadcast to connected clients.
pub async fn register_video(
    State(state): State<AppState>,
    Json(request): Json<RegisterVideoRequest>,
) -> ApiResult<Json<Video>> {
    if request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }

    tracing::info!(name = %request.name, "Registering video");

    let video = Video::new(&request.name, request.url, request.tags);
    let created = crate::db::videos::create(&state.db, &video).await?;
    crate::db::tags::record_tags(&state.db, &created.tags).await?;

    state.event_bus.emit_lossy(VssEvent::VideoAdded {
        video: created.clone(),
        timestamp: Utc::now(),
    });

    Ok(Json(created))
}

/// GET /videos/:video_id
///
/// Fetch a single video by id.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
) -> ApiResult<Json<Video>> {
    let video = crate::db::videos::get(&state.db, video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Video not found: {}", video_id)))?;

    Ok(Json(video))
}

/// Build video directory routes
pub fn video_routes() -> Router<AppState> {
    Router::new()
        .route("/videos", get(list_videos))
        .route("/videos", post(register_video))
        .route("/videos/:video_id", get(get_video))
}
