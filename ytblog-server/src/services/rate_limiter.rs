//! Outbound request limiter for quota-constrained LLM providers
//!
//! A [`ProviderLimiter`] combines up to three constraints:
//! - minimum spacing between request starts (governor quota, burst 1)
//! - a reservoir of N requests per window (governor quota, burst N)
//! - a cap on requests in flight (semaphore)
//!
//! Callers over quota wait in line; nothing is rejected.

use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::Semaphore;
use tracing::debug;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Limiter shape for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterSettings {
    pub min_spacing: Option<Duration>,
    /// (requests, window)
    pub reservoir: Option<(u32, Duration)>,
    pub max_concurrent: usize,
}

impl LimiterSettings {
    /// Azure OpenAI deployment quota: one request per 6 s, 10 per minute, one at a time
    pub fn primary() -> Self {
        Self {
            min_spacing: Some(Duration::from_secs(6)),
            reservoir: Some((10, Duration::from_secs(60))),
            max_concurrent: 1,
        }
    }

    /// OpenRouter / Ollama: one request per second, one at a time
    pub fn fallback() -> Self {
        Self {
            min_spacing: Some(Duration::from_secs(1)),
            reservoir: None,
            max_concurrent: 1,
        }
    }
}

pub struct ProviderLimiter {
    spacing: Option<DirectLimiter>,
    reservoir: Option<DirectLimiter>,
    concurrency: Semaphore,
}

impl ProviderLimiter {
    pub fn new(settings: &LimiterSettings) -> Self {
        let spacing = settings
            .min_spacing
            .and_then(Quota::with_period)
            .map(RateLimiter::direct);

        let reservoir = settings.reservoir.and_then(|(requests, window)| {
            let burst = NonZeroU32::new(requests)?;
            let quota = Quota::with_period(window / requests)?.allow_burst(burst);
            Some(RateLimiter::direct(quota))
        });

        Self {
            spacing,
            reservoir,
            concurrency: Semaphore::new(settings.max_concurrent.max(1)),
        }
    }

    /// Run `task` once every constraint allows it
    pub async fn schedule<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so acquisition only fails in theory
        let _permit = self.concurrency.acquire().await.ok();

        if let Some(reservoir) = &self.reservoir {
            if reservoir.check().is_err() {
                debug!("Reservoir empty, waiting for refill");
                reservoir.until_ready().await;
            }
        }
        if let Some(spacing) = &self.spacing {
            spacing.until_ready().await;
        }

        task.await
    }
}
