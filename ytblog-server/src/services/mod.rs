//! External collaborators and the fetch-orchestration engines

pub mod captions_client;
pub mod inflight;
pub mod llm_client;
pub mod prompts;
pub mod rate_limiter;
pub mod summary_generator;
pub mod transcript_fetcher;
pub mod youtube_client;

pub use captions_client::{CaptionsError, CaptionsProvider, YouTubeCaptionsClient};
pub use llm_client::{
    AzureOpenAiProvider, CompletionProvider, LlmError, OllamaProvider, OpenRouterProvider,
    RateLimitedProvider,
};
pub use rate_limiter::{LimiterSettings, ProviderLimiter};
pub use summary_generator::{GeneratedSummary, SummaryError, SummaryGenerator, SummaryService, SummaryStage};
pub use transcript_fetcher::{TranscriptFetcher, TranscriptOutcome};
pub use youtube_client::{VideoSource, YouTubeClient, YouTubeError};
