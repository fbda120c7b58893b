//! Transcript cache maintenance
//!
//! Clearing a transcript also clears the summary generated from it.

use axum::{
    extract::{Path, State},
    routing::delete,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Cleared {
    pub transcript: bool,
    pub summary: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub cleared: Cleared,
}

/// DELETE /api/transcript-cache
pub async fn clear_all_transcripts(State(state): State<AppState>) -> ApiResult<Json<ClearResponse>> {
    state.transcripts.clear_all().await?;
    state.summaries.clear_all().await?;
    info!("Cleared transcript and summary caches");

    Ok(Json(ClearResponse {
        message: "Transcript and summary caches cleared successfully".to_string(),
        cleared: Cleared {
            transcript: true,
            summary: true,
        },
    }))
}

/// DELETE /api/transcript-cache/:id
///
/// `cleared` reports which caches actually held an entry.
pub async fn clear_transcript(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<ClearResponse>> {
    let transcript = state.transcripts.delete(&video_id).await?;
    let summary = state.summaries.delete(&video_id).await?;
    info!(video_id = %video_id, transcript, summary, "Cleared cached video content");

    Ok(Json(ClearResponse {
        message: format!("Cache cleared for video {}", video_id),
        cleared: Cleared { transcript, summary },
    }))
}

/// Build transcript cache routes
pub fn cache_routes() -> Router<AppState> {
    Router::new()
        .route("/api/transcript-cache", delete(clear_all_transcripts))
        .route("/api/transcript-cache/:id", delete(clear_transcript))
}
