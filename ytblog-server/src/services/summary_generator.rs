//! Summary generation engine
//!
//! The primary provider (when enabled) is tried first. A rate-limit failure
//! falls through to the fallback provider exactly once; any other primary
//! failure is returned as is. There are no retries beyond that.
//!
//! [`SummaryService`] wraps the engine with the cache-first lookup and
//! persistence used by the video details handler.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::inflight::KeyedLocks;
use super::llm_client::{CompletionProvider, LlmError};
use super::prompts::{finance_blog_prompt, general_blog_prompt};
use crate::cache::SummaryCache;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("{provider} API error: {source}")]
    Provider {
        provider: String,
        #[source]
        source: LlmError,
    },

    #[error("{0} returned an empty summary")]
    Empty(String),
}

impl SummaryError {
    fn provider(provider: &dyn CompletionProvider, source: LlmError) -> Self {
        SummaryError::Provider {
            provider: provider.name().to_string(),
            source,
        }
    }
}

/// Which route produced a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStage {
    /// Primary provider answered
    Primary,
    /// Primary was rate limited; fallback answered
    Fallback,
    /// Primary disabled; fallback provider used directly
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSummary {
    pub text: String,
    pub provider: String,
    pub stage: SummaryStage,
}

pub struct SummaryGenerator {
    primary: Option<Arc<dyn CompletionProvider>>,
    fallback: Arc<dyn CompletionProvider>,
}

impl SummaryGenerator {
    pub fn new(primary: Option<Arc<dyn CompletionProvider>>, fallback: Arc<dyn CompletionProvider>) -> Self {
        Self { primary, fallback }
    }

    pub async fn generate(&self, transcript: &str) -> Result<GeneratedSummary, SummaryError> {
        let Some(primary) = &self.primary else {
            debug!(provider = self.fallback.name(), "Primary provider disabled");
            return self.run_fallback(transcript, SummaryStage::Direct).await;
        };

        info!(provider = primary.name(), "Generating summary");
        match primary.complete(&finance_blog_prompt(transcript)).await {
            Ok(text) => finish(primary.as_ref(), text, SummaryStage::Primary),
            Err(e) if e.is_rate_limited() => {
                warn!(
                    primary = primary.name(),
                    fallback = self.fallback.name(),
                    error = %e,
                    "Primary provider rate limited, falling back"
                );
                self.run_fallback(transcript, SummaryStage::Fallback).await
            }
            Err(e) => Err(SummaryError::provider(primary.as_ref(), e)),
        }
    }

    async fn run_fallback(&self, transcript: &str, stage: SummaryStage) -> Result<GeneratedSummary, SummaryError> {
        let provider = self.fallback.as_ref();
        let text = provider
            .complete(&general_blog_prompt(transcript))
            .await
            .map_err(|e| SummaryError::provider(provider, e))?;
        finish(provider, text, stage)
    }
}

fn finish(
    provider: &dyn CompletionProvider,
    text: String,
    stage: SummaryStage,
) -> Result<GeneratedSummary, SummaryError> {
    if text.trim().is_empty() {
        return Err(SummaryError::Empty(provider.name().to_string()));
    }
    info!(provider = provider.name(), ?stage, "Summary generated");
    Ok(GeneratedSummary {
        text,
        provider: provider.name().to_string(),
        stage,
    })
}

/// Cache-first summaries keyed by video id
pub struct SummaryService {
    generator: SummaryGenerator,
    cache: Arc<SummaryCache>,
    inflight: KeyedLocks,
}

impl SummaryService {
    pub fn new(generator: SummaryGenerator, cache: Arc<SummaryCache>) -> Self {
        Self {
            generator,
            cache,
            inflight: KeyedLocks::new(),
        }
    }

    /// Cached summary for `video_id`, else generate from `transcript` and persist
    ///
    /// A failed cache write is logged and does not fail the request.
    pub async fn summary_for(&self, video_id: &str, transcript: &str) -> Result<String, SummaryError> {
        if let Some(summary) = self.cache.get(video_id).await {
            debug!(video_id, "Summary cache hit");
            return Ok(summary);
        }

        let _guard = self.inflight.lock(video_id).await;
        if let Some(summary) = self.cache.get(video_id).await {
            return Ok(summary);
        }

        let generated = self.generator.generate(transcript).await?;
        if let Err(e) = self.cache.set(video_id, &generated.text).await {
            warn!(video_id, error = %e, "Failed to cache summary");
        }
        Ok(generated.text)
    }
}
