//! Error types for ytblog-server HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::cache::CacheError;
use crate::services::{SummaryError, YouTubeError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Explicit cache maintenance failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// YouTube Data API failure
    #[error(transparent)]
    YouTube(#[from] YouTubeError),

    /// Summary generation failed (never cached)
    #[error(transparent)]
    Summary(#[from] SummaryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::Cache(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update cache".to_string(),
                err.to_string(),
            ),
            ApiError::YouTube(YouTubeError::VideoNotFound(id)) => {
                (StatusCode::NOT_FOUND, "Video not found".to_string(), id)
            }
            ApiError::YouTube(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch video details".to_string(),
                err.to_string(),
            ),
            ApiError::Summary(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate summary".to_string(),
                err.to_string(),
            ),
        };

        (status, Json(json!({ "error": error, "details": details }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
