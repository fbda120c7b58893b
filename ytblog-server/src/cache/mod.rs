//! Cache tier
//!
//! - [`MemoryCache`]: ephemeral TTL map (video metadata)
//! - [`JsonStore`]: persisted map with an in-memory mirror, instantiated as
//!   [`TranscriptCache`], [`SummaryCache`] and [`VideoCache`] under `<data_dir>/cache`

pub mod json_store;
pub mod memory;
pub mod summaries;
pub mod transcripts;
pub mod videos;

pub use json_store::JsonStore;
pub use memory::MemoryCache;
pub use summaries::SummaryCache;
pub use transcripts::{TranscriptCache, TranscriptRecord};
pub use videos::{ChannelVideos, VideoCache};

use thiserror::Error;

/// Persisted cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transcript payload was not a plain string
    #[error("Refusing to cache non-string transcript for {video_id}")]
    InvalidTranscript { video_id: String },
}

pub type CacheResult<T> = Result<T, CacheError>;
