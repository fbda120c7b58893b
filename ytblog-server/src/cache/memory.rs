//! In-memory key/value cache with per-entry expiry
//!
//! Expired entries are removed lazily on `get` and proactively by a periodic
//! sweep task. There is no size bound or LRU eviction; the service caches a
//! handful of channels and videos at most.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default entry lifetime (1 hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Default interval between expiry sweeps (5 minutes)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expiry: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expiry
    }
}

/// TTL cache shared across request handlers behind an `Arc`
pub struct MemoryCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone + Send + 'static> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone + Send + 'static> MemoryCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still safe to use.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `value` under `key` with the default TTL
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expiry: Instant::now() + ttl,
        };
        self.entries().insert(key.into(), entry);
    }

    /// Return the live value for `key`; an expired entry is removed and reported as a miss
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries();
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    pub fn delete(&self, key: &str) {
        self.entries().remove(key);
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn sweep_expired(&self) -> usize {
        let mut entries = self.entries();
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Run `sweep_expired` every `interval` until `shutdown` is cancelled
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = cache.sweep_expired();
                        if removed > 0 {
                            debug!(removed, "Swept expired memory cache entries");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_live_before_ttl_and_removed_after() {
        let cache: MemoryCache<String> = MemoryCache::default();
        cache.set_with_ttl("k", "v".to_string(), Duration::from_millis(100));

        tokio::time::advance(Duration::from_millis(50)).await;
        assert_eq!(cache.get("k"), Some("v".to_string()));

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(cache.get("k"), None);
        // Lazy expiry removed it from storage
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_is_one_hour() {
        let cache: MemoryCache<u32> = MemoryCache::default();
        cache.set("k", 7);

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert_eq!(cache.get("k"), Some(7));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache: MemoryCache<u32> = MemoryCache::default();
        cache.set("a", 1);
        cache.set("b", 2);

        cache.delete("a");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let cache: MemoryCache<u32> = MemoryCache::default();
        cache.set_with_ttl("short", 1, Duration::from_secs(1));
        cache.set_with_ttl("long", 2, Duration::from_secs(100));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_runs_without_reads() {
        let cache: Arc<MemoryCache<u32>> = Arc::new(MemoryCache::default());
        cache.set_with_ttl("k", 1, Duration::from_secs(10));

        let shutdown = CancellationToken::new();
        let handle = cache.spawn_sweeper(Duration::from_secs(60), shutdown.clone());

        // Let the sweeper consume its first tick, then cross one interval
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert_eq!(cache.len(), 0);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
