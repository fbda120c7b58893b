//! Transcript acquisition engine
//!
//! Cache first, then each configured language in priority order until one
//! yields at least one caption cue. A failing language never aborts the
//! chain; only exhaustion of every language is reported, as
//! [`TranscriptOutcome::Unavailable`].
//!
//! Cue texts are joined with single spaces. Cue timing is not kept.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::captions_client::CaptionsProvider;
use super::inflight::KeyedLocks;
use crate::cache::TranscriptCache;
use crate::models::{CaptionCue, Language};

/// Result of a transcript request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptOutcome {
    Found {
        transcript: String,
        /// Display name of the language that produced the transcript; `None` on a cache hit
        language: Option<String>,
        /// Cue count; `None` on a cache hit
        total_captions: Option<usize>,
        cached: bool,
    },
    Unavailable {
        /// `"<Language>: <message>"` per language that errored
        errors: Vec<String>,
        /// Languages whose captions came back empty
        available_languages: Vec<String>,
    },
}

impl TranscriptOutcome {
    pub fn transcript(&self) -> Option<&str> {
        match self {
            TranscriptOutcome::Found { transcript, .. } => Some(transcript),
            TranscriptOutcome::Unavailable { .. } => None,
        }
    }
}

/// Outcome of trying one language
enum LanguageAttempt {
    Cues(Vec<CaptionCue>),
    Empty,
    Failed(String),
}

pub struct TranscriptFetcher {
    captions: Arc<dyn CaptionsProvider>,
    cache: Arc<TranscriptCache>,
    languages: Vec<Language>,
    inflight: KeyedLocks,
}

impl TranscriptFetcher {
    pub fn new(
        captions: Arc<dyn CaptionsProvider>,
        cache: Arc<TranscriptCache>,
        languages: Vec<Language>,
    ) -> Self {
        Self {
            captions,
            cache,
            languages,
            inflight: KeyedLocks::new(),
        }
    }

    /// Transcript for `video_id`, from cache or freshly fetched
    pub async fn fetch(&self, video_id: &str) -> TranscriptOutcome {
        if let Some(found) = self.cached(video_id).await {
            return found;
        }

        let _guard = self.inflight.lock(video_id).await;
        // Another request may have filled the cache while we waited
        if let Some(found) = self.cached(video_id).await {
            return found;
        }

        self.fetch_uncached(video_id).await
    }

    async fn cached(&self, video_id: &str) -> Option<TranscriptOutcome> {
        let transcript = self.cache.get(video_id).await?;
        debug!(video_id, "Transcript cache hit");
        Some(TranscriptOutcome::Found {
            transcript,
            language: None,
            total_captions: None,
            cached: true,
        })
    }

    async fn fetch_uncached(&self, video_id: &str) -> TranscriptOutcome {
        info!(video_id, languages = self.languages.len(), "Fetching transcript");

        let mut errors = Vec::new();
        let mut available_languages = Vec::new();

        for language in &self.languages {
            match self.try_language(video_id, language).await {
                LanguageAttempt::Cues(cues) => {
                    let transcript = join_cues(&cues);
                    info!(
                        video_id,
                        language = %language.name,
                        captions = cues.len(),
                        "Fetched transcript"
                    );

                    if let Err(e) = self.cache.set(video_id, &transcript).await {
                        warn!(video_id, error = %e, "Failed to cache transcript");
                    }

                    return TranscriptOutcome::Found {
                        transcript,
                        language: Some(language.name.clone()),
                        total_captions: Some(cues.len()),
                        cached: false,
                    };
                }
                LanguageAttempt::Empty => available_languages.push(language.name.clone()),
                LanguageAttempt::Failed(message) => {
                    errors.push(format!("{}: {}", language.name, message));
                }
            }
        }

        warn!(video_id, tried = self.languages.len(), "No transcript found in any language");
        TranscriptOutcome::Unavailable {
            errors,
            available_languages,
        }
    }

    async fn try_language(&self, video_id: &str, language: &Language) -> LanguageAttempt {
        debug!(video_id, language = %language.code, "Trying caption language");
        match self.captions.fetch_cues(video_id, &language.code).await {
            // A track of blank cues joins to an empty transcript
            Ok(cues) if cues.iter().all(|cue| cue.text.trim().is_empty()) => LanguageAttempt::Empty,
            Ok(cues) => LanguageAttempt::Cues(cues),
            Err(e) => {
                debug!(video_id, language = %language.code, error = %e, "Caption language failed");
                LanguageAttempt::Failed(e.to_string())
            }
        }
    }
}

/// Concatenate cue texts with single spaces
pub fn join_cues(cues: &[CaptionCue]) -> String {
    cues.iter()
        .map(|cue| cue.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
