//! Video endpoints
//!
//! - `GET /api/videos/:id`: metadata, transcript and summary in one response
//! - `GET /api/videos/:id/transcript`: transcript only
//! - `GET /api/videos/channel/:id`: latest uploads of a channel
//! - cache maintenance for channel lists and summaries

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::ApiResult;
use crate::models::{VideoMetadata, VideoSummary};
use crate::services::youtube_client::DEFAULT_MAX_RESULTS;
use crate::services::TranscriptOutcome;
use crate::AppState;

pub const NO_TRANSCRIPT: &str = "No transcript available";

const TRANSCRIPT_SUGGESTIONS: [&str; 5] = [
    "The video might not have captions enabled",
    "The captions might be in a different language than the ones we tried",
    "The video might be too new and captions are still being processed",
    "Try checking if captions are available on YouTube directly",
    "Try a different video that you know has captions",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetailsResponse {
    #[serde(flatten)]
    pub video: VideoMetadata,
    pub transcript: String,
    pub summary: String,
    /// Set when a piece of the response could not be produced
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResponse {
    pub transcript: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_captions: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptUnavailableResponse {
    pub error: String,
    pub details: String,
    pub available_languages: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ChannelVideosResponse {
    pub videos: Vec<VideoSummary>,
}

/// Metadata from the memory cache, else from the video source
async fn video_metadata(state: &AppState, video_id: &str) -> ApiResult<VideoMetadata> {
    if let Some(metadata) = state.metadata.get(video_id) {
        return Ok(metadata);
    }
    let metadata = state.video_source.video_details(video_id).await?;
    state.metadata.set(video_id, metadata.clone());
    Ok(metadata)
}

/// GET /api/videos/:id
pub async fn get_video_details(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoDetailsResponse>> {
    info!(video_id = %video_id, "Fetching video details");

    let video = video_metadata(&state, &video_id).await?;

    let (transcript, summary, error) = match state.transcript_fetcher.fetch(&video_id).await {
        TranscriptOutcome::Found { transcript, .. } => {
            let summary = state.summary_service.summary_for(&video_id, &transcript).await?;
            (transcript, summary, None)
        }
        TranscriptOutcome::Unavailable { .. } => (String::new(), String::new(), Some(NO_TRANSCRIPT.to_string())),
    };

    Ok(Json(VideoDetailsResponse {
        video,
        transcript,
        summary,
        error,
    }))
}

/// GET /api/videos/:id/transcript
pub async fn get_transcript(State(state): State<AppState>, Path(video_id): Path<String>) -> Response {
    match state.transcript_fetcher.fetch(&video_id).await {
        TranscriptOutcome::Found {
            transcript,
            language,
            total_captions,
            ..
        } => Json(TranscriptResponse {
            transcript,
            language,
            total_captions,
        })
        .into_response(),
        TranscriptOutcome::Unavailable {
            errors,
            available_languages,
        } => {
            let body = TranscriptUnavailableResponse {
                error: NO_TRANSCRIPT.to_string(),
                details: errors.join(", "),
                available_languages,
                suggestions: TRANSCRIPT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            };
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

/// GET /api/videos/channel/:id
pub async fn get_channel_videos(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<ChannelVideosResponse>> {
    if let Some(videos) = state.videos.get(&channel_id).await {
        return Ok(Json(ChannelVideosResponse { videos }));
    }

    info!(channel_id = %channel_id, "Refreshing channel videos");
    let videos = state
        .video_source
        .channel_videos(&channel_id, DEFAULT_MAX_RESULTS)
        .await?;

    if let Err(e) = state.videos.set(&channel_id, videos.clone()).await {
        warn!(channel_id = %channel_id, error = %e, "Failed to cache channel videos");
    }
    Ok(Json(ChannelVideosResponse { videos }))
}

/// DELETE /api/videos/:id/cache (channel id)
pub async fn clear_channel_cache(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.videos.delete(&channel_id).await?;
    info!(channel_id = %channel_id, "Cleared channel video cache");
    Ok(Json(json!({
        "message": format!("Video cache cleared for channel {}", channel_id),
    })))
}

/// DELETE /api/videos/:id/summary-cache
pub async fn clear_summary(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.summaries.delete(&video_id).await?;
    info!(video_id = %video_id, "Cleared summary cache entry");
    Ok(Json(json!({
        "message": format!("Summary cache cleared for video {}", video_id),
    })))
}

/// DELETE /api/videos/summary-cache
pub async fn clear_all_summaries(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    state.summaries.clear_all().await?;
    info!("Cleared summary cache");
    Ok(Json(json!({ "message": "Summary cache cleared successfully" })))
}

/// Build video routes
pub fn video_routes() -> Router<AppState> {
    Router::new()
        .route("/api/videos/summary-cache", delete(clear_all_summaries))
        .route("/api/videos/channel/:id", get(get_channel_videos))
        .route("/api/videos/:id", get(get_video_details))
        .route("/api/videos/:id/transcript", get(get_transcript))
        .route("/api/videos/:id/cache", delete(clear_channel_cache))
        .route("/api/videos/:id/summary-cache", delete(clear_summary))
}
