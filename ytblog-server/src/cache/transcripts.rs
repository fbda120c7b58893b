//! Persisted transcript cache (`transcripts.json`)
//!
//! File layout: `{ "<videoId>": { "transcript": "<text>", "timestamp": <ms since epoch> } }`.
//! Entries older than the configured max age (24 h by default) are pruned once
//! at load time and otherwise treated as misses when read; there is no
//! background sweep for this cache.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ytblog_common::time::{age_millis, now_millis};

use super::{CacheError, CacheResult, JsonStore};

pub const FILE_NAME: &str = "transcripts.json";

/// Default transcript lifetime
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// One persisted transcript; `transcript` is always plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub transcript: String,
    /// Milliseconds since the Unix epoch at write time
    pub timestamp: i64,
}

impl TranscriptRecord {
    fn is_expired(&self, max_age: Duration) -> bool {
        u128::from(age_millis(self.timestamp)) > max_age.as_millis()
    }
}

pub struct TranscriptCache {
    store: JsonStore<TranscriptRecord>,
    max_age: Duration,
}

impl TranscriptCache {
    pub async fn open(cache_dir: &Path) -> Self {
        Self::open_with_max_age(cache_dir, DEFAULT_MAX_AGE).await
    }

    pub async fn open_with_max_age(cache_dir: &Path, max_age: Duration) -> Self {
        let store: JsonStore<TranscriptRecord> = JsonStore::open(cache_dir.join(FILE_NAME), "transcripts").await;

        let has_expired = store
            .snapshot()
            .await
            .values()
            .any(|record| record.is_expired(max_age));
        if has_expired {
            match store.retain(|_, record| !record.is_expired(max_age)).await {
                Ok(removed) => info!(removed, "Pruned expired transcripts"),
                Err(e) => warn!(error = %e, "Failed to prune expired transcripts"),
            }
        }

        Self { store, max_age }
    }

    /// Cached transcript text, or `None` when absent or older than the max age
    pub async fn get(&self, video_id: &str) -> Option<String> {
        let record = self.store.get(video_id).await?;
        if record.is_expired(self.max_age) {
            if let Err(e) = self.store.delete(video_id).await {
                warn!(video_id, error = %e, "Failed to drop expired transcript");
            }
            return None;
        }
        Some(record.transcript)
    }

    pub async fn set(&self, video_id: &str, transcript: &str) -> CacheResult<()> {
        let record = TranscriptRecord {
            transcript: transcript.to_string(),
            timestamp: now_millis(),
        };
        self.store.set(video_id, record).await
    }

    /// Store an untyped payload, rejecting anything that is not a JSON string
    ///
    /// Guards callers holding decoded JSON rather than text. Rejected payloads
    /// are logged and never reach the backing file.
    pub async fn set_value(&self, video_id: &str, value: &serde_json::Value) -> CacheResult<()> {
        match value.as_str() {
            Some(text) => self.set(video_id, text).await,
            None => {
                warn!(video_id, payload = %value, "Attempted to cache non-string transcript");
                Err(CacheError::InvalidTranscript {
                    video_id: video_id.to_string(),
                })
            }
        }
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
