//! Transcript acquisition engine tests
//!
//! Language fallback order, exhaustion reporting, cache-first idempotence and
//! coalescing of concurrent requests for one video.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{cues, default_languages, ScriptedCaptions, Script};
use tempfile::TempDir;
use ytblog_server::cache::TranscriptCache;
use ytblog_server::services::{TranscriptFetcher, TranscriptOutcome};

async fn fetcher(dir: &TempDir, captions: Arc<ScriptedCaptions>) -> (TranscriptFetcher, Arc<TranscriptCache>) {
    let cache = Arc::new(TranscriptCache::open(dir.path()).await);
    let fetcher = TranscriptFetcher::new(captions, Arc::clone(&cache), default_languages());
    (fetcher, cache)
}

#[tokio::test]
async fn test_falls_back_to_next_language() {
    // Given: English fails, Hindi has three cues
    let dir = TempDir::new().unwrap();
    let captions = Arc::new(ScriptedCaptions::new(&[
        ("en", Script::Fail("no english track")),
        ("hi", Script::Cues(cues(&["a", "b", "c"]))),
    ]));
    let (fetcher, cache) = fetcher(&dir, Arc::clone(&captions)).await;

    // When
    let outcome = fetcher.fetch("vid1").await;

    // Then: Hindi transcript, joined with spaces, persisted
    assert_eq!(
        outcome,
        TranscriptOutcome::Found {
            transcript: "a b c".to_string(),
            language: Some("Hindi".to_string()),
            total_captions: Some(3),
            cached: false,
        }
    );
    assert_eq!(captions.calls(), 2, "languages after the first success are not tried");
    assert_eq!(cache.get("vid1").await.as_deref(), Some("a b c"));
}

#[tokio::test]
async fn test_warm_cache_makes_no_network_calls() {
    let dir = TempDir::new().unwrap();
    let captions = Arc::new(ScriptedCaptions::new(&[("en", Script::Cues(cues(&["hello", "world"])))]));
    let (fetcher, _cache) = fetcher(&dir, Arc::clone(&captions)).await;

    let first = fetcher.fetch("vid").await;
    let calls_after_first = captions.calls();

    let second = fetcher.fetch("vid").await;
    let third = fetcher.fetch("vid").await;

    assert_eq!(captions.calls(), calls_after_first);
    assert_eq!(first.transcript(), Some("hello world"));
    assert_eq!(second.transcript(), first.transcript());
    assert_eq!(second, third);
    assert!(matches!(second, TranscriptOutcome::Found { cached: true, language: None, .. }));
}

#[tokio::test]
async fn test_exhaustion_reports_every_language() {
    let dir = TempDir::new().unwrap();
    // Nothing scripted: every language errors
    let captions = Arc::new(ScriptedCaptions::new(&[]));
    let (fetcher, cache) = fetcher(&dir, Arc::clone(&captions)).await;

    let outcome = fetcher.fetch("nocaps").await;

    let TranscriptOutcome::Unavailable { errors, available_languages } = outcome else {
        panic!("expected unavailable outcome");
    };
    assert_eq!(errors.len(), default_languages().len());
    assert_eq!(captions.calls(), default_languages().len());
    assert!(errors[0].starts_with("English: "), "got {}", errors[0]);
    assert!(errors[9].starts_with("Chinese: "), "got {}", errors[9]);
    assert!(available_languages.is_empty());
    assert_eq!(cache.get("nocaps").await, None);
}

#[tokio::test]
async fn test_empty_tracks_are_listed_separately_from_errors() {
    let dir = TempDir::new().unwrap();
    let captions = Arc::new(ScriptedCaptions::new(&[
        ("en", Script::Empty),
        ("hi", Script::Fail("timed out")),
        ("es", Script::Empty),
    ]));
    let (fetcher, _cache) = fetcher(&dir, captions).await;

    let TranscriptOutcome::Unavailable { errors, available_languages } = fetcher.fetch("vid").await else {
        panic!("expected unavailable outcome");
    };

    assert_eq!(available_languages, vec!["English".to_string(), "Spanish".to_string()]);
    assert_eq!(errors.len(), 8);
    assert_eq!(errors[0], "Hindi: Parse error: timed out");
}

#[tokio::test]
async fn test_blank_cues_count_as_empty_track() {
    // Given: English has only whitespace cues, Hindi has real text
    let dir = TempDir::new().unwrap();
    let captions = Arc::new(ScriptedCaptions::new(&[
        ("en", Script::Cues(cues(&["", "  "]))),
        ("hi", Script::Cues(cues(&["namaste"]))),
    ]));
    let (fetcher, cache) = fetcher(&dir, Arc::clone(&captions)).await;

    let outcome = fetcher.fetch("vid").await;

    assert_eq!(outcome.transcript(), Some("namaste"));
    assert_eq!(captions.calls(), 2);
    assert_eq!(cache.get("vid").await.as_deref(), Some("namaste"));
}

#[tokio::test]
async fn test_only_blank_cues_is_unavailable_and_not_cached() {
    let dir = TempDir::new().unwrap();
    let captions = Arc::new(ScriptedCaptions::new(&[("en", Script::Cues(cues(&[""])))]));
    let (fetcher, cache) = fetcher(&dir, captions).await;

    let TranscriptOutcome::Unavailable { available_languages, .. } = fetcher.fetch("blank").await else {
        panic!("expected unavailable outcome");
    };

    assert_eq!(available_languages, vec!["English".to_string()]);
    assert_eq!(cache.get("blank").await, None);
}

#[tokio::test]
async fn test_concurrent_requests_fetch_once() {
    let dir = TempDir::new().unwrap();
    let captions = Arc::new(
        ScriptedCaptions::new(&[("en", Script::Cues(cues(&["x"])))]).with_delay(Duration::from_millis(50)),
    );
    let (fetcher, _cache) = fetcher(&dir, Arc::clone(&captions)).await;
    let fetcher = Arc::new(fetcher);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fetcher = Arc::clone(&fetcher);
            tokio::spawn(async move { fetcher.fetch("same").await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().transcript(), Some("x"));
    }
    assert_eq!(captions.calls(), 1);
}

#[tokio::test]
async fn test_cache_write_failure_still_returns_transcript() {
    let dir = TempDir::new().unwrap();
    // A directory where the temp file should go makes every write fail
    std::fs::create_dir_all(dir.path().join("transcripts.json.tmp")).unwrap();

    let captions = Arc::new(ScriptedCaptions::new(&[("en", Script::Cues(cues(&["still", "works"])))]));
    let (fetcher, _cache) = fetcher(&dir, captions).await;

    let outcome = fetcher.fetch("vid").await;

    assert_eq!(outcome.transcript(), Some("still works"));
    assert!(!dir.path().join("transcripts.json").exists());
}
