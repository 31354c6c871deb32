//! Result cache with per-entry time-to-live.
//!
//! Backed by `moka::future::Cache`. Every entry carries its own lifetime;
//! moka evicts on real time, and lookups additionally check the entry's
//! deadline against an injectable [`Clock`] so expiry is testable without
//! sleeping.

mod key;
mod single_flight;

pub use key::CacheKey;
pub use single_flight::SingleFlight;

use moka::future::Cache;
use moka::Expiry;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::trace;

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.start + offset
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
    expires_at: Instant,
}

struct EntryLifetime;

impl<V> Expiry<String, Entry<V>> for EntryLifetime {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Keyed store of computed results.
///
/// Values are returned by clone. The cache is shared by reference across
/// concurrent requests.
#[derive(Clone)]
pub struct ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<String, Entry<V>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V> ResultCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_entries: u64, default_ttl: Duration) -> Self {
        Self::with_clock(max_entries, default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(max_entries: u64, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryLifetime)
            .build();
        Self {
            cache,
            default_ttl,
            clock,
        }
    }

    /// Returns the live value for `key`, dropping it if its lifetime has passed.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entry = self.cache.get(key).await?;
        if self.clock.now() >= entry.expires_at {
            trace!(key, "Cache entry expired");
            self.cache.invalidate(key).await;
            return None;
        }
        Some(entry.value)
    }

    /// Stores `value` under `key` for `ttl`, or the default lifetime when `None`.
    pub async fn put(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = Entry {
            value,
            ttl,
            expires_at: self.clock.now() + ttl,
        };
        self.cache.insert(key.into(), entry).await;
    }

    /// Drops every entry.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Number of stored entries after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock() -> (ResultCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = ResultCache::with_clock(100, Duration::from_secs(60), clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (cache, _) = cache_with_clock();
        cache.put("k", "v".to_string(), None).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_own_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.put("short", "a".to_string(), Some(Duration::from_secs(10))).await;
        cache.put("long", "b".to_string(), None).await;

        clock.advance(Duration::from_secs(9));
        assert!(cache.get("short").await.is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("short").await.is_none());
        assert!(cache.get("long").await.is_some());

        clock.advance(Duration::from_secs(50));
        assert!(cache.get("long").await.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_and_resets_lifetime() {
        let (cache, clock) = cache_with_clock();
        cache.put("k", "old".to_string(), Some(Duration::from_secs(5))).await;
        clock.advance(Duration::from_secs(4));
        cache.put("k", "new".to_string(), Some(Duration::from_secs(5))).await;
        clock.advance(Duration::from_secs(4));
        assert_eq!(cache.get("k").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_invalidate_all_empties_cache() {
        let (cache, _) = cache_with_clock();
        cache.put("a", "1".to_string(), None).await;
        cache.put("b", "2".to_string(), None).await;
        assert_eq!(cache.entry_count().await, 2);

        cache.invalidate_all().await;
        assert_eq!(cache.entry_count().await, 0);
        assert!(cache.get("a").await.is_none());
    }
}
