//! YouTube captions client
//!
//! Scrapes the caption track list out of the public watch page, then
//! downloads the chosen track's timed-text XML and turns it into cues.
//! No API key is needed; YouTube may change the page shape at any time, so
//! every failure is reported per language and never treated as fatal by the
//! caller.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::CaptionCue;

const WATCH_URL: &str = "https://www.youtube.com/watch";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const CAPTION_TRACKS_MARKER: &str = "\"captionTracks\":";

#[derive(Debug, Error)]
pub enum CaptionsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} while fetching {what}")]
    Http { status: u16, what: String },

    #[error("Could not find captions for video: {0}")]
    NoCaptionTracks(String),

    #[error("Could not find {language} captions for {video_id}")]
    LanguageUnavailable { video_id: String, language: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Source of caption cues for a video in a given language
#[async_trait]
pub trait CaptionsProvider: Send + Sync {
    /// Fetch all cues of `video_id` in `language_code`
    ///
    /// `Ok(vec![])` means the track exists but holds no cues.
    async fn fetch_cues(
        &self,
        video_id: &str,
        language_code: &str,
    ) -> Result<Vec<CaptionCue>, CaptionsError>;
}

/// Entry of the `captionTracks` array embedded in the watch page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    #[serde(default)]
    pub vss_id: String,
    #[serde(default)]
    pub language_code: String,
}

pub struct YouTubeCaptionsClient {
    http_client: reqwest::Client,
    watch_url: String,
}

impl YouTubeCaptionsClient {
    pub fn new() -> Result<Self, CaptionsError> {
        Self::with_watch_url(WATCH_URL)
    }

    /// Client pointed at a different watch-page host (used against local fixtures)
    pub fn with_watch_url(watch_url: impl Into<String>) -> Result<Self, CaptionsError> {
        let http_client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CaptionsError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            watch_url: watch_url.into(),
        })
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)], what: &str) -> Result<String, CaptionsError> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| CaptionsError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptionsError::Http {
                status: status.as_u16(),
                what: what.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| CaptionsError::Network(e.to_string()))
    }
}

#[async_trait]
impl CaptionsProvider for YouTubeCaptionsClient {
    async fn fetch_cues(
        &self,
        video_id: &str,
        language_code: &str,
    ) -> Result<Vec<CaptionCue>, CaptionsError> {
        let page = self
            .get_text(&self.watch_url, &[("v", video_id)], "watch page")
            .await?;

        let tracks = extract_caption_tracks(&page)
            .ok_or_else(|| CaptionsError::NoCaptionTracks(video_id.to_string()))?;
        debug!(video_id, tracks = tracks.len(), "Found caption tracks");

        let track = select_track(&tracks, language_code).ok_or_else(|| {
            CaptionsError::LanguageUnavailable {
                video_id: video_id.to_string(),
                language: language_code.to_string(),
            }
        })?;

        let xml = self.get_text(&track.base_url, &[], "caption track").await?;
        parse_timed_text(&xml)
    }
}

/// Pull the `captionTracks` JSON array out of a watch page
///
/// Returns `None` when the page carries no caption metadata at all.
pub fn extract_caption_tracks(page: &str) -> Option<Vec<CaptionTrack>> {
    let start = page.find(CAPTION_TRACKS_MARKER)? + CAPTION_TRACKS_MARKER.len();
    // The stream deserializer stops after the first complete value
    serde_json::Deserializer::from_str(&page[start..])
        .into_iter::<Vec<CaptionTrack>>()
        .next()?
        .ok()
}

/// Choose the track for `language_code`
///
/// Preference: manual track (`.en`), auto-generated track (`a.en`), regional
/// variants (`.en-GB`), then a bare `languageCode` match.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], language_code: &str) -> Option<&'a CaptionTrack> {
    let manual = format!(".{}", language_code);
    let auto = format!("a.{}", language_code);
    let regional = format!(".{}-", language_code);

    tracks
        .iter()
        .find(|t| t.vss_id == manual)
        .or_else(|| tracks.iter().find(|t| t.vss_id == auto))
        .or_else(|| tracks.iter().find(|t| t.vss_id.contains(&regional)))
        .or_else(|| tracks.iter().find(|t| t.language_code == language_code))
}

fn text_element_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<text\b([^>]*)>(.*?)</text>"#).expect("valid text element pattern")
    })
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(start|dur)="([0-9.]+)""#).expect("valid attribute pattern")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"))
}

fn numeric_entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid entity pattern"))
}

/// Parse YouTube timed-text XML into cues
///
/// Blank cues are skipped. A document without `<text>` elements yields an
/// empty list; a `<text>` without a parseable `start` is a parse error.
pub fn parse_timed_text(xml: &str) -> Result<Vec<CaptionCue>, CaptionsError> {
    let mut cues = Vec::new();

    for element in text_element_regex().captures_iter(xml) {
        let mut start = None;
        let mut duration = 0.0;
        for attr in attribute_regex().captures_iter(&element[1]) {
            let value: f64 = attr[2]
                .parse()
                .map_err(|_| CaptionsError::Parse(format!("bad {} value '{}'", &attr[1], &attr[2])))?;
            match &attr[1] {
                "start" => start = Some(value),
                _ => duration = value,
            }
        }
        let start = start.ok_or_else(|| CaptionsError::Parse("text element without start".to_string()))?;

        let text = clean_cue_text(&element[2]);
        if text.is_empty() {
            continue;
        }

        cues.push(CaptionCue { start, duration, text });
    }

    Ok(cues)
}

/// Decode entities (YouTube double-encodes some), strip inline markup, collapse whitespace
fn clean_cue_text(raw: &str) -> String {
    let decoded = decode_entities(raw);
    let stripped = tag_regex().replace_all(&decoded, "");
    let decoded_again = decode_entities(&stripped);
    decoded_again.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    let numeric = numeric_entity_regex().replace_all(text, |caps: &regex::Captures| {
        let code = &caps[1];
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    numeric
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
