//! Credential and provider resolution for ytblog-server
//!
//! Each setting is resolved with **ENV → TOML** priority. Empty or
//! whitespace-only values count as absent. A setting present in both sources
//! logs a warning naming them.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};
use ytblog_common::config::{CompiledDefaults, FallbackBackend, TomlConfig};

pub const ENV_YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_AZURE_OPENAI_KEY: &str = "AZURE_OPENAI_KEY";
pub const ENV_AZURE_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_AZURE_OPENAI_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
pub const ENV_OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_OLLAMA_API_URL: &str = "OLLAMA_API_URL";
pub const ENV_USE_AZURE_OPENAI: &str = "USE_AZURE_OPENAI";
pub const ENV_APP_URL: &str = "APP_URL";

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub cache_dir: PathBuf,
    pub languages: Vec<String>,
    pub transcript_max_age: Duration,
    pub video_ttl: Duration,
    pub memory_ttl: Duration,
    pub sweep_interval: Duration,
    pub allowed_origins: Vec<String>,
    pub youtube_api_key: Option<String>,
    pub azure_openai_key: Option<String>,
    pub azure_openai_endpoint: Option<String>,
    pub azure_openai_deployment: Option<String>,
    pub use_azure_openai: bool,
    pub fallback: FallbackBackend,
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: Option<String>,
    pub ollama_api_url: Option<String>,
    pub ollama_model: Option<String>,
    pub app_url: Option<String>,
}

impl ServerConfig {
    /// Resolve settings from the environment and `toml`
    ///
    /// `host` / `port` overrides come from the command line and win over TOML.
    pub fn resolve(
        toml: &TomlConfig,
        cache_dir: PathBuf,
        host: Option<IpAddr>,
        port: Option<u16>,
    ) -> Self {
        let creds = &toml.credentials;
        let defaults = CompiledDefaults::for_current_platform();

        let toml_host = toml.host.as_deref().and_then(|h| match h.parse() {
            Ok(addr) => Some(addr),
            Err(_) => {
                warn!("Ignoring invalid host '{}' in TOML config", h);
                None
            }
        });

        Self {
            host: host.or(toml_host).unwrap_or(defaults.host),
            port: port.or(toml.port).unwrap_or(defaults.port),
            cache_dir,
            languages: toml.transcripts.languages.clone(),
            transcript_max_age: Duration::from_secs(toml.transcripts.max_age_hours * 60 * 60),
            video_ttl: Duration::from_secs(toml.cache.video_ttl_secs),
            memory_ttl: Duration::from_secs(toml.cache.memory_ttl_secs),
            sweep_interval: Duration::from_secs(toml.cache.sweep_interval_secs.max(1)),
            allowed_origins: toml.cors.allowed_origins.clone(),
            youtube_api_key: resolve_setting("YouTube API key", ENV_YOUTUBE_API_KEY, creds.youtube_api_key.as_deref()),
            azure_openai_key: resolve_setting("Azure OpenAI key", ENV_AZURE_OPENAI_KEY, creds.azure_openai_key.as_deref()),
            azure_openai_endpoint: resolve_setting(
                "Azure OpenAI endpoint",
                ENV_AZURE_OPENAI_ENDPOINT,
                creds.azure_openai_endpoint.as_deref(),
            ),
            azure_openai_deployment: resolve_setting(
                "Azure OpenAI deployment",
                ENV_AZURE_OPENAI_DEPLOYMENT,
                creds.azure_openai_deployment.as_deref(),
            ),
            use_azure_openai: resolve_flag(ENV_USE_AZURE_OPENAI, toml.summary.use_azure_openai),
            fallback: toml.summary.fallback,
            openrouter_api_key: resolve_setting(
                "OpenRouter API key",
                ENV_OPENROUTER_API_KEY,
                creds.openrouter_api_key.as_deref(),
            ),
            openrouter_model: toml.summary.openrouter_model.clone(),
            ollama_api_url: resolve_setting("Ollama URL", ENV_OLLAMA_API_URL, creds.ollama_api_url.as_deref()),
            ollama_model: toml.summary.ollama_model.clone(),
            app_url: resolve_setting("App URL", ENV_APP_URL, creds.app_url.as_deref()),
        }
    }
}

fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Resolve one string setting with ENV → TOML priority
pub fn resolve_setting(label: &str, env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_present(v));
    let toml_value = toml_value.filter(|v| is_present(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in multiple sources: environment ({}), TOML. Using environment (highest priority).",
            label, env_var
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", label);
        return Some(value.trim().to_string());
    }
    toml_value.map(|value| {
        info!("{} loaded from TOML config", label);
        value.trim().to_string()
    })
}

/// Boolean setting: ENV (`true`/`1`/`yes`) → TOML → false
pub fn resolve_flag(env_var: &str, toml_value: Option<bool>) -> bool {
    match std::env::var(env_var) {
        Ok(value) if is_present(&value) => {
            matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
        }
        _ => toml_value.unwrap_or(false),
    }
}
