//! ytblog-server - YouTube to blog content service
//!
//! Serves video metadata, transcripts and AI-generated blog summaries backed
//! by a memory cache and persisted JSON caches under `<data_dir>/cache`.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use ytblog_common::config::{
    default_config_path, load_toml_config, DataFolderInitializer, DataFolderResolver,
};

use ytblog_server::cache::{MemoryCache, SummaryCache, TranscriptCache, VideoCache};
use ytblog_server::config::ServerConfig;
use ytblog_server::models::Language;
use ytblog_server::services::{SummaryService, TranscriptFetcher, YouTubeCaptionsClient, YouTubeClient};
use ytblog_server::{build_router, build_summary_generator, AppState};

/// Command-line arguments for ytblog-server
#[derive(Parser, Debug)]
#[command(name = "ytblog-server")]
#[command(about = "YouTube to blog caching and summary service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "YTBLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Data folder holding the cache directory
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    host: Option<IpAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Missing .env is normal
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let config_path = args
        .config
        .clone()
        .or_else(default_config_path)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let toml_config = load_toml_config(&config_path).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let level = &toml_config.logging.level;
                format!("ytblog_server={level},ytblog_common={level},tower_http=debug").into()
            }),
        )
        .init();

    info!(
        "Starting ytblog-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Config file: {}", config_path.display());
    if dotenv_loaded {
        info!("Loaded environment from .env");
    }

    let data_dir = DataFolderResolver::new(args.data_dir.clone()).resolve(&toml_config);
    let initializer = DataFolderInitializer::new(data_dir);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize data folder")?;
    info!("Data folder: {}", initializer.data_dir().display());

    let config = ServerConfig::resolve(&toml_config, initializer.cache_dir(), args.host, args.port);

    let transcripts = Arc::new(TranscriptCache::open_with_max_age(&config.cache_dir, config.transcript_max_age).await);
    let summaries = Arc::new(SummaryCache::open(&config.cache_dir).await);
    let videos = Arc::new(VideoCache::open(&config.cache_dir, config.video_ttl).await);
    let metadata = Arc::new(MemoryCache::new(config.memory_ttl));

    let languages = Language::list_from_codes(config.languages.as_slice());
    info!(
        "Transcript languages: {}",
        languages.iter().map(|l| l.code.as_str()).collect::<Vec<_>>().join(", ")
    );

    let captions = Arc::new(YouTubeCaptionsClient::new().context("Failed to build captions client")?);
    let transcript_fetcher = Arc::new(TranscriptFetcher::new(captions, Arc::clone(&transcripts), languages));

    let generator = build_summary_generator(&config).context("Invalid summary provider configuration")?;
    let summary_service = Arc::new(SummaryService::new(generator, Arc::clone(&summaries)));

    let video_source = Arc::new(
        YouTubeClient::new(config.youtube_api_key.clone()).context("Failed to build YouTube client")?,
    );
    if config.youtube_api_key.is_none() {
        info!("YouTube API key not configured; video metadata requests will fail");
    }

    let shutdown = CancellationToken::new();
    let sweeper = metadata.spawn_sweeper(config.sweep_interval, shutdown.clone());

    let state = AppState {
        transcripts,
        summaries,
        videos,
        metadata,
        transcript_fetcher,
        summary_service,
        video_source,
        allowed_origins: Arc::new(config.allowed_origins.clone()),
        startup_time: Utc::now(),
    };
    let app = build_router(state);

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Server error")?;

    shutdown.cancel();
    let _ = sweeper.await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C / SIGTERM and cancels background tasks
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
    shutdown.cancel();
}
