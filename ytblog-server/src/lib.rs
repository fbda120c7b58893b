//! ytblog-server library interface
//!
//! Caching and fetch-orchestration core for turning YouTube videos into blog
//! drafts. Exposed as a library so integration tests can build the router
//! with in-process collaborators.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use ytblog_common::config::FallbackBackend;

use crate::cache::{MemoryCache, SummaryCache, TranscriptCache, VideoCache};
use crate::config::ServerConfig;
use crate::models::VideoMetadata;
use crate::services::{
    AzureOpenAiProvider, CompletionProvider, LimiterSettings, LlmError, OllamaProvider, OpenRouterProvider,
    ProviderLimiter, RateLimitedProvider, SummaryGenerator, SummaryService, TranscriptFetcher, VideoSource,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub transcripts: Arc<TranscriptCache>,
    pub summaries: Arc<SummaryCache>,
    /// Per-channel video lists
    pub videos: Arc<VideoCache>,
    /// Video metadata, ephemeral
    pub metadata: Arc<MemoryCache<VideoMetadata>>,
    pub transcript_fetcher: Arc<TranscriptFetcher>,
    pub summary_service: Arc<SummaryService>,
    pub video_source: Arc<dyn VideoSource>,
    pub allowed_origins: Arc<Vec<String>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

/// Build the summary engine for the configured providers
///
/// The primary is only used when enabled; an enabled but unconfigured
/// primary is a configuration error.
pub fn build_summary_generator(config: &ServerConfig) -> Result<SummaryGenerator, LlmError> {
    let primary: Option<Arc<dyn CompletionProvider>> = if config.use_azure_openai {
        let azure = AzureOpenAiProvider::new(
            config.azure_openai_key.clone(),
            config.azure_openai_endpoint.clone(),
            config.azure_openai_deployment.clone(),
        )?;
        if !azure.is_configured() {
            return Err(LlmError::NotConfigured("Azure OpenAI"));
        }
        let limiter = ProviderLimiter::new(&LimiterSettings::primary());
        Some(Arc::new(RateLimitedProvider::new(azure, limiter)))
    } else {
        None
    };

    let limiter = ProviderLimiter::new(&LimiterSettings::fallback());
    let fallback: Arc<dyn CompletionProvider> = match config.fallback {
        FallbackBackend::OpenRouter => {
            let provider = OpenRouterProvider::new(
                config.openrouter_api_key.clone(),
                config.openrouter_model.clone(),
                config.app_url.clone(),
            )?;
            if config.openrouter_api_key.is_none() {
                warn!("OpenRouter API key not configured; fallback summaries will fail");
            }
            Arc::new(RateLimitedProvider::new(provider, limiter))
        }
        FallbackBackend::Ollama => {
            let provider = OllamaProvider::new(config.ollama_api_url.clone(), config.ollama_model.clone())?;
            Arc::new(RateLimitedProvider::new(provider, limiter))
        }
    };

    info!(
        primary = primary.as_ref().map(|p| p.name()).unwrap_or("disabled"),
        fallback = fallback.name(),
        "Summary providers configured"
    );
    Ok(SummaryGenerator::new(primary, fallback))
}

/// CORS for the configured browser origins; unparsable origins are skipped
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    Router::new()
        .merge(api::video_routes())
        .merge(api::cache_routes())
        .merge(api::health_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
