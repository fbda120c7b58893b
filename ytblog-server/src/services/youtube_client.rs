//! YouTube Data API v3 client
//!
//! Thin wrapper over the `videos` and `search` resources: single video
//! metadata for the details page, and the latest uploads of a channel.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::{VideoMetadata, VideoSummary};

const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Default number of videos listed per channel
pub const DEFAULT_MAX_RESULTS: u32 = 50;

#[derive(Debug, Error)]
pub enum YouTubeError {
    #[error("YouTube API key not configured (set YOUTUBE_API_KEY)")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("YouTube API error {0}: {1}")]
    Api(u16, String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Video metadata collaborator used by the HTTP handlers
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn video_details(&self, video_id: &str) -> Result<VideoMetadata, YouTubeError>;

    async fn channel_videos(
        &self,
        channel_id: &str,
        max_results: u32,
    ) -> Result<Vec<VideoSummary>, YouTubeError>;
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    /// Medium size when available, else the default size
    fn best_url(&self) -> String {
        self.medium
            .as_ref()
            .or(self.default.as_ref())
            .map(|t| t.url.clone())
            .unwrap_or_default()
    }
}

pub struct YouTubeClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl YouTubeClient {
    pub fn new(api_key: Option<String>) -> Result<Self, YouTubeError> {
        Self::with_base_url(YOUTUBE_API_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, YouTubeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(ytblog_common::config::get_user_agent())
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| YouTubeError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            api_key,
        })
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, YouTubeError> {
        let api_key = self.api_key.as_deref().ok_or(YouTubeError::NotConfigured)?;
        let url = format!("{}/{}", self.base_url, resource);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .query(&[("key", api_key)])
            .send()
            .await
            .map_err(|e| YouTubeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(YouTubeError::Api(status.as_u16(), error_text));
        }

        let list: ListResponse<T> = response
            .json()
            .await
            .map_err(|e| YouTubeError::Parse(e.to_string()))?;
        Ok(list.items)
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn video_details(&self, video_id: &str) -> Result<VideoMetadata, YouTubeError> {
        debug!(video_id, "Querying YouTube videos resource");

        let items: Vec<VideoItem> = self
            .get_list("videos", &[("part", "snippet"), ("id", video_id)])
            .await?;

        let item = items
            .into_iter()
            .next()
            .ok_or_else(|| YouTubeError::VideoNotFound(video_id.to_string()))?;

        Ok(VideoMetadata {
            id: video_id.to_string(),
            thumbnail: item.snippet.thumbnails.best_url(),
            title: item.snippet.title,
            description: item.snippet.description,
            published_at: item.snippet.published_at,
        })
    }

    async fn channel_videos(
        &self,
        channel_id: &str,
        max_results: u32,
    ) -> Result<Vec<VideoSummary>, YouTubeError> {
        debug!(channel_id, max_results, "Querying YouTube search resource");

        let max_results = max_results.to_string();
        let items: Vec<SearchItem> = self
            .get_list(
                "search",
                &[
                    ("channelId", channel_id),
                    ("part", "snippet,id"),
                    ("order", "date"),
                    ("type", "video"),
                    ("maxResults", &max_results),
                ],
            )
            .await?;

        Ok(items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id?;
                Some(VideoSummary {
                    id,
                    thumbnail: item.snippet.thumbnails.best_url(),
                    title: item.snippet.title,
                    published_at: item.snippet.published_at,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_prefers_medium() {
        let json = r#"{"title":"t","thumbnails":{"default":{"url":"d"},"medium":{"url":"m"}}}"#;
        let snippet: Snippet = serde_json::from_str(json).unwrap();
        assert_eq!(snippet.thumbnails.best_url(), "m");

        let json = r#"{"title":"t","thumbnails":{"default":{"url":"d"}}}"#;
        let snippet: Snippet = serde_json::from_str(json).unwrap();
        assert_eq!(snippet.thumbnails.best_url(), "d");
    }

    #[test]
    fn test_search_items_without_video_id_parse() {
        let json = r#"{"items":[{"id":{"kind":"youtube#channel"},"snippet":{"title":"chan"}}]}"#;
        let list: ListResponse<SearchItem> = serde_json::from_str(json).unwrap();
        assert!(list.items[0].id.video_id.is_none());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_not_configured() {
        let client = YouTubeClient::new(None).unwrap();
        let result = client.video_details("abc").await;
        assert!(matches!(result, Err(YouTubeError::NotConfigured)));
    }
}
