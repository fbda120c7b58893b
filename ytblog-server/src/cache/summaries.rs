//! Persisted summary cache (`summaries.json`)
//!
//! Flat `videoId → summary text` map without expiry; entries live until cleared.

use std::path::Path;

use super::{CacheResult, JsonStore};

pub const FILE_NAME: &str = "summaries.json";

pub struct SummaryCache {
    store: JsonStore<String>,
}

impl SummaryCache {
    pub async fn open(cache_dir: &Path) -> Self {
        Self {
            store: JsonStore::open(cache_dir.join(FILE_NAME), "summaries").await,
        }
    }

    pub async fn get(&self, video_id: &str) -> Option<String> {
        self.store.get(video_id).await
    }

    pub async fn set(&self, video_id: &str, summary: &str) -> CacheResult<()> {
        self.store.set(video_id, summary.to_string()).await
    }

    pub async fn delete(&self, video_id: &str) -> CacheResult<bool> {
        self.store.delete(video_id).await
    }

    pub async fn clear_all(&self) -> CacheResult<()> {
        self.store.clear_all().await
    }

    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.store.is_empty().await
    }
}
