//! Domain types shared by the caches, services and HTTP handlers

use serde::{Deserialize, Serialize};

/// Snapshot of a video as listed for a channel
///
/// Replaced wholesale on every channel refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub published_at: String,
}

/// Snippet metadata for a single video (YouTube Data API `videos` resource)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub published_at: String,
}

/// One caption fragment as returned by the captions provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCue {
    /// Offset from the start of the video, in seconds
    pub start: f64,
    /// Display duration, in seconds
    pub duration: f64,
    pub text: String,
}

/// A caption language to try: ISO code plus display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub code: String,
    pub name: String,
}

impl Language {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }

    /// Build a language from its code, using the known display name when there is one
    pub fn from_code(code: &str) -> Self {
        let name = match code {
            "en" => "English",
            "hi" => "Hindi",
            "es" => "Spanish",
            "fr" => "French",
            "de" => "German",
            "pt" => "Portuguese",
            "ru" => "Russian",
            "ja" => "Japanese",
            "ko" => "Korean",
            "zh" => "Chinese",
            other => other,
        };
        Self::new(code, name)
    }

    /// Parse a configured priority list, skipping blank entries
    pub fn list_from_codes<S: AsRef<str>>(codes: &[S]) -> Vec<Language> {
        codes
            .iter()
            .map(|c| c.as_ref().trim())
            .filter(|c| !c.is_empty())
            .map(Language::from_code)
            .collect()
    }
}
