//! Persisted per-channel video list cache (`videos.json`)
//!
//! Each channel's list is replaced wholesale on refresh and considered stale
//! after its TTL (1 hour by default).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use ytblog_common::time::{age_millis, now_millis};

use super::{CacheResult, JsonStore};
use crate::models::VideoSummary;

pub const FILE_NAME: &str = "videos.json";

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelVideos {
    pub videos: Vec<VideoSummary>,
    /// Milliseconds since the Unix epoch at refresh time
    pub timestamp: i64,
}

pub struct VideoCache {
    store: JsonStore<ChannelVideos>,
    ttl: Duration,
}

impl VideoCache {
    pub async fn open(cache_dir: &Path, ttl: Duration) -> Self {
        Self {
            store: JsonStore::open(cache_dir.join(FILE_NAME), "videos").await,
            ttl,
        }
    }

    /// Cached list for `channel_id`, or `None` when absent or stale
    pub async fn get(&self, channel_id: &str) -> Option<Vec<VideoSummary>> {
        let entry = self.store.get(channel_id).await?;
        if u128::from(age_millis(entry.timestamp)) > self.ttl.as_millis() {
            if let Err(e) = self.store.delete(channel_id).await {
                warn!(channel_id, error = %e, "Failed to drop stale channel videos");
            }
            return None;
        }
        Some(entry.videos)
    }

    pub async fn set(&self, channel_id: &str, videos: Vec<VideoSummary>) -> CacheResult<()> {
        let entry = ChannelVideos {
            videos,
            timestamp: now_millis(),
        };
        self.store.set(channel_id, entry).await
    }

    pub async fn delete(&self, channel_id: &str) -> CacheResult<bool> {
        self.store.delete(channel_id).await
    }

    pub async fn clear_all(&self) -> CacheResult<()> {
        self.store.clear_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn video(id: &str) -> VideoSummary {
        VideoSummary {
            id: id.to_string(),
            title: format!("Video {}", id),
            thumbnail: format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", id),
            published_at: "2024-05-01T10:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_list_wholesale() {
        let dir = TempDir::new().unwrap();
        let cache = VideoCache::open(dir.path(), DEFAULT_TTL).await;

        cache.set("chan", vec![video("a"), video("b")]).await.unwrap();
        cache.set("chan", vec![video("c")]).await.unwrap();

        assert_eq!(cache.get("chan").await, Some(vec![video("c")]));
    }

    #[tokio::test]
    async fn test_stale_list_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = VideoCache::open(dir.path(), Duration::from_millis(20)).await;
        cache.set("chan", vec![video("a")]).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get("chan").await, None);
    }

    #[tokio::test]
    async fn test_delete_one_channel() {
        let dir = TempDir::new().unwrap();
        let cache = VideoCache::open(dir.path(), DEFAULT_TTL).await;
        cache.set("one", vec![video("a")]).await.unwrap();
        cache.set("two", vec![video("b")]).await.unwrap();

        assert!(cache.delete("one").await.unwrap());
        assert_eq!(cache.get("one").await, None);
        assert!(cache.get("two").await.is_some());
    }
}
