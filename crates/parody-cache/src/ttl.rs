//! TTL cache with lazy eviction.
//!
//! A single instance is constructed at startup and shared by every
//! concurrent request. Individual reads and writes are atomic; the lock is
//! never held across a compute future, so two requests that miss the same
//! key concurrently will both compute and the later write wins.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::metrics::{record_evictions, record_hit, record_miss};

/// Default entry lifetime (1 hour).
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Cached value with expiration tracking.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        let created_at = Instant::now();
        Self {
            value,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

/// Snapshot of cache occupancy. `valid + expired == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
}

/// Keyed store with per-entry time-to-live.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache whose entries live `default_ttl` unless told otherwise.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a key. Expired entries behave like a miss and are removed.
    pub async fn get(&self, key: &str) -> Option<V> {
        // Fast path: shared lock
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(Instant::now()) => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // Slow path: the entry looked expired, remove it under the write lock
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        // Double-check: another task may have replaced it while we waited
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(entry) => {
                debug!(key = %key, age_ms = entry.age(now).as_millis() as u64, "Evicting expired cache entry");
                entries.remove(key);
                record_evictions(1);
                None
            }
            None => None,
        }
    }

    /// Store a value with the default TTL, replacing any existing entry.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl).await;
    }

    /// Store a value with an explicit TTL, replacing any existing entry.
    pub async fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(key.into(), CacheEntry::new(value, ttl));
    }

    /// Return the cached value or compute, store and return it (default TTL).
    pub async fn get_or_compute<F, Fut, E>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.get_or_compute_with_ttl(key, compute, self.default_ttl)
            .await
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// A failed `compute` propagates its error and leaves the cache untouched.
    pub async fn get_or_compute_with_ttl<F, Fut, E>(
        &self,
        key: &str,
        compute: F,
        ttl: Duration,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            debug!(key = %key, "Cache hit");
            record_hit(key);
            return Ok(value);
        }

        debug!(key = %key, "Cache miss, computing");
        record_miss(key);

        let value = compute().await?;
        self.set_with_ttl(key, value.clone(), ttl).await;
        Ok(value)
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        debug!(count = count, "Cache cleared");
    }

    /// Remove expired entries only. Returns how many were removed.
    pub async fn cleanup(&self) -> usize {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let before = entries.len();

        entries.retain(|_, entry| !entry.is_expired(now));

        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed = removed, remaining = entries.len(), "Cache cleanup");
            record_evictions(removed);
        }
        removed
    }

    /// Count entries by validity at the moment of the call.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let now = Instant::now();
        let expired = entries.values().filter(|e| e.is_expired(now)).count();

        CacheStats {
            total: entries.len(),
            valid: entries.len() - expired,
            expired,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_get_after_expiry_is_a_miss_and_evicts() {
        let cache = TtlCache::new(TTL);
        cache.set("k", 1u32).await;
        assert_eq!(cache.get("k").await, Some(1));

        tokio::time::advance(TTL + Duration::from_millis(1)).await;

        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_overwrites_existing_entry() {
        let cache = TtlCache::new(TTL);
        cache.set("k", "old".to_string()).await;
        cache.set("k", "new".to_string()).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("new"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_or_compute_runs_once_within_ttl_and_again_after() {
        let cache = TtlCache::new(TTL);
        let calls = AtomicU32::new(0);

        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, String>(42u32) }
        };

        assert_eq!(cache.get_or_compute("k", compute).await, Ok(42));
        assert_eq!(cache.get_or_compute("k", compute).await, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(TTL).await;

        assert_eq!(cache.get_or_compute("k", compute).await, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_compute_is_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new(TTL);
        let calls = AtomicU32::new(0);

        let result = cache
            .get_or_compute("k", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>("upstream down") }
            })
            .await;
        assert_eq!(result, Err("upstream down"));
        assert!(cache.is_empty().await);

        let result = cache
            .get_or_compute("k", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, &str>(7) }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_removes_only_expired_entries() {
        let cache = TtlCache::new(TTL);
        cache.set_with_ttl("short", 1u32, Duration::from_secs(1)).await;
        cache.set("long", 2u32).await;

        tokio::time::advance(Duration::from_secs(2)).await;

        let stats = cache.stats().await;
        assert_eq!(
            stats,
            CacheStats {
                total: 2,
                valid: 1,
                expired: 1
            }
        );

        assert_eq!(cache.cleanup().await, 1);
        assert_eq!(cache.get("long").await, Some(2));
        assert_eq!(cache.stats().await.total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_empties_everything() {
        let cache = TtlCache::new(TTL);
        cache.set("a", 1u32).await;
        cache.set("b", 2u32).await;
        cache.clear().await;
        assert_eq!(cache.stats().await, CacheStats::default());
    }
}
