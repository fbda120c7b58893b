//! In-process collaborators shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ytblog_server::cache::{MemoryCache, SummaryCache, TranscriptCache, VideoCache};
use ytblog_server::models::{CaptionCue, Language, VideoMetadata, VideoSummary};
use ytblog_server::services::prompts::BlogPrompt;
use ytblog_server::services::{
    CaptionsError, CaptionsProvider, CompletionProvider, LlmError, SummaryGenerator, SummaryService,
    TranscriptFetcher, VideoSource, YouTubeError,
};
use ytblog_server::AppState;

pub fn cues(texts: &[&str]) -> Vec<CaptionCue> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| CaptionCue {
            start: i as f64 * 2.0,
            duration: 2.0,
            text: text.to_string(),
        })
        .collect()
}

/// What the scripted captions provider answers for one language
#[derive(Clone)]
pub enum Script {
    Cues(Vec<CaptionCue>),
    Empty,
    Fail(&'static str),
}

/// Captions provider answering from a per-language script; unscripted languages fail
pub struct ScriptedCaptions {
    script: HashMap<String, Script>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedCaptions {
    pub fn new(script: &[(&str, Script)]) -> Self {
        Self {
            script: script
                .iter()
                .map(|(code, s)| (code.to_string(), s.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptionsProvider for ScriptedCaptions {
    async fn fetch_cues(&self, video_id: &str, language_code: &str) -> Result<Vec<CaptionCue>, CaptionsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.script.get(language_code) {
            Some(Script::Cues(cues)) => Ok(cues.clone()),
            Some(Script::Empty) => Ok(Vec::new()),
            Some(Script::Fail(message)) => Err(CaptionsError::Parse(message.to_string())),
            None => Err(CaptionsError::LanguageUnavailable {
                video_id: video_id.to_string(),
                language: language_code.to_string(),
            }),
        }
    }
}

/// Completion provider replaying scripted results in order, counting calls
pub struct ScriptedProvider {
    name: &'static str,
    results: Mutex<Vec<Result<String, LlmError>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<BlogPrompt>>,
}

impl ScriptedProvider {
    pub fn new(name: &'static str, results: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            results: Mutex::new(results),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(name: &'static str, text: &str) -> Arc<Self> {
        Self::new(name, vec![Ok(text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<BlogPrompt> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(&self, prompt: &BlogPrompt) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            return Err(LlmError::Api {
                status: 500,
                message: "script exhausted".to_string(),
            });
        }
        results.remove(0)
    }
}

/// Video source with fixed metadata and channel lists, counting calls
#[derive(Default)]
pub struct StubVideoSource {
    pub videos: HashMap<String, VideoMetadata>,
    pub channels: HashMap<String, Vec<VideoSummary>>,
    pub detail_calls: AtomicUsize,
    pub channel_calls: AtomicUsize,
}

impl StubVideoSource {
    pub fn with_video(mut self, id: &str, title: &str) -> Self {
        self.videos.insert(
            id.to_string(),
            VideoMetadata {
                id: id.to_string(),
                title: title.to_string(),
                description: format!("About {}", title),
                thumbnail: format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", id),
                published_at: "2024-06-01T12:00:00Z".to_string(),
            },
        );
        self
    }

    pub fn with_channel(mut self, channel_id: &str, ids: &[&str]) -> Self {
        let videos = ids
            .iter()
            .map(|id| VideoSummary {
                id: id.to_string(),
                title: format!("Video {}", id),
                thumbnail: String::new(),
                published_at: "2024-06-01T12:00:00Z".to_string(),
            })
            .collect();
        self.channels.insert(channel_id.to_string(), videos);
        self
    }
}

#[async_trait]
impl VideoSource for StubVideoSource {
    async fn video_details(&self, video_id: &str) -> Result<VideoMetadata, YouTubeError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.videos
            .get(video_id)
            .cloned()
            .ok_or_else(|| YouTubeError::VideoNotFound(video_id.to_string()))
    }

    async fn channel_videos(&self, channel_id: &str, _max_results: u32) -> Result<Vec<VideoSummary>, YouTubeError> {
        self.channel_calls.fetch_add(1, Ordering::SeqCst);
        self.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| YouTubeError::Api(400, "unknown channel".to_string()))
    }
}

pub fn default_languages() -> Vec<Language> {
    Language::list_from_codes(&["en", "hi", "es", "fr", "de", "pt", "ru", "ja", "ko", "zh"])
}

/// Collaborators behind an [`AppState`]
pub struct TestApp {
    pub state: AppState,
    pub captions: Arc<ScriptedCaptions>,
    pub video_source: Arc<StubVideoSource>,
}

pub async fn test_app(
    cache_dir: &Path,
    captions: ScriptedCaptions,
    video_source: StubVideoSource,
    primary: Option<Arc<ScriptedProvider>>,
    fallback: Arc<ScriptedProvider>,
) -> TestApp {
    let transcripts = Arc::new(TranscriptCache::open(cache_dir).await);
    let summaries = Arc::new(SummaryCache::open(cache_dir).await);
    let videos = Arc::new(VideoCache::open(cache_dir, Duration::from_secs(3600)).await);
    let captions = Arc::new(captions);
    let video_source = Arc::new(video_source);

    let primary: Option<Arc<dyn CompletionProvider>> = primary.map(|p| p as Arc<dyn CompletionProvider>);
    let generator = SummaryGenerator::new(primary, fallback);

    let state = AppState {
        transcripts: Arc::clone(&transcripts),
        summaries: Arc::clone(&summaries),
        videos,
        metadata: Arc::new(MemoryCache::new(Duration::from_secs(3600))),
        transcript_fetcher: Arc::new(TranscriptFetcher::new(
            captions.clone(),
            transcripts,
            default_languages(),
        )),
        summary_service: Arc::new(SummaryService::new(generator, summaries)),
        video_source: video_source.clone(),
        allowed_origins: Arc::new(vec!["http://localhost:5173".to_string()]),
        startup_time: Utc::now(),
    };

    TestApp {
        state,
        captions,
        video_source,
    }
}
