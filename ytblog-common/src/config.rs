//! Bootstrap configuration and data folder resolution
//!
//! Configuration sources, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: the service logs a warning and starts
//! with defaults. A TOML file that exists but cannot be parsed is reported as
//! [`Error::Config`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the data folder
pub const DATA_DIR_ENV: &str = "YTBLOG_DATA_DIR";

/// Default HTTP port (matches the frontend's expected backend port)
pub const DEFAULT_PORT: u16 = 3005;

/// Default transcript language priority (ISO 639-1 codes)
pub const DEFAULT_LANGUAGES: [&str; 10] = ["en", "hi", "es", "fr", "de", "pt", "ru", "ja", "ko", "zh"];

/// Compiled-in defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_dir: PathBuf,
    pub host: IpAddr,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("ytblog"))
            .unwrap_or_else(|| PathBuf::from("./data"));

        Self {
            data_dir,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
        }
    }
}

/// Contents of `config.toml`
///
/// Every field is optional in the file; serde defaults fill the gaps.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Folder holding `cache/` (transcripts.json, summaries.json, videos.json)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub transcripts: TranscriptConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    /// External service credentials (environment variables take precedence)
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Transcript acquisition settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptConfig {
    /// Caption languages to try, in priority order
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Persisted transcripts older than this are treated as missing
    #[serde(default = "default_transcript_max_age_hours")]
    pub max_age_hours: u64,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            max_age_hours: default_transcript_max_age_hours(),
        }
    }
}

/// Cache lifetimes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// TTL of a channel's persisted video list
    #[serde(default = "default_hour_secs")]
    pub video_ttl_secs: u64,

    /// Default TTL of the in-memory cache
    #[serde(default = "default_hour_secs")]
    pub memory_ttl_secs: u64,

    /// Interval of the in-memory cache expiry sweep
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            video_ttl_secs: default_hour_secs(),
            memory_ttl_secs: default_hour_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Which backend handles summaries when the primary is disabled or throttled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackBackend {
    #[default]
    OpenRouter,
    Ollama,
}

/// Summary generation settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SummaryConfig {
    /// Route requests through Azure OpenAI first
    #[serde(default)]
    pub use_azure_openai: Option<bool>,

    #[serde(default)]
    pub fallback: FallbackBackend,

    /// OpenRouter model identifier
    #[serde(default)]
    pub openrouter_model: Option<String>,

    /// Ollama model name
    #[serde(default)]
    pub ollama_model: Option<String>,
}

/// Allowed browser origins
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// API keys and endpoints of external collaborators
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    pub youtube_api_key: Option<String>,
    pub azure_openai_key: Option<String>,
    pub azure_openai_endpoint: Option<String>,
    pub azure_openai_deployment: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub ollama_api_url: Option<String>,
    pub app_url: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()
}

fn default_transcript_max_age_hours() -> u64 {
    24
}

fn default_hour_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_allowed_origins() -> Vec<String> {
    ["localhost", "127.0.0.1"]
        .iter()
        .flat_map(|host| {
            [8080, 5173, 3000, 3005]
                .iter()
                .map(move |port| format!("http://{}:{}", host, port))
        })
        .collect()
}

/// Default location of the TOML config file (`~/.config/ytblog/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ytblog").join("config.toml"))
}

/// Load TOML configuration, degrading to defaults when the file is absent
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolves the data folder following CLI → ENV → TOML → default priority
pub struct DataFolderResolver {
    cli_arg: Option<PathBuf>,
}

impl DataFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>) -> Self {
        Self { cli_arg }
    }

    pub fn resolve(&self, toml: &TomlConfig) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(DATA_DIR_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &toml.data_dir {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().data_dir
    }
}

/// Creates the data folder layout on startup
pub struct DataFolderInitializer {
    data_dir: PathBuf,
}

impl DataFolderInitializer {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Create `<data_dir>/cache` (and parents) if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        let cache_dir = self.cache_dir();
        if !cache_dir.exists() {
            std::fs::create_dir_all(&cache_dir)?;
            info!("Created cache directory: {}", cache_dir.display());
        }
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }
}

/// User-Agent sent with API requests to external services
pub fn get_user_agent() -> String {
    format!("ytblog/{}", env!("CARGO_PKG_VERSION"))
}
