//! In-memory response cache with per-entry TTL.
//!
//! Entries are evicted lazily: on the read that finds them stale, or by an
//! explicit [`ResponseCache::cleanup`] sweep. The cache never runs background work.
//! Note: Data is lost on process restart.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use vaultcord_core::Clock;
use vaultcord_core::ports::{CacheStatus, ResponseCache};

/// TTL applied when `set` is called without one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

struct CacheEntry<V> {
    value: V,
    stored_at: i64,
    expires_at: i64,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at
    }
}

/// In-memory cache using a HashMap with async RwLock, generic over the stored value.
pub struct InMemoryResponseCache<V> {
    store: RwLock<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    clock: Clock,
}

impl<V> InMemoryResponseCache<V> {
    pub fn new() -> Self {
        Self::with_clock(DEFAULT_TTL, Clock::new())
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Clock::new())
    }

    pub fn with_clock(default_ttl: Duration, clock: Clock) -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
            default_ttl,
            clock,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Number of stored entries, including stale ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    /// Age of a fresh entry.
    pub async fn age(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now_millis();
        let store = self.store.read().await;
        let entry = store.get(key).filter(|e| e.is_fresh(now))?;
        let age = u64::try_from(now - entry.stored_at).unwrap_or(0);
        Some(Duration::from_millis(age))
    }

    fn ttl_millis(ttl: Duration) -> i64 {
        i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
    }

    async fn evict_if_stale(&self, key: &str, now: i64) {
        let mut store = self.store.write().await;
        // Another writer may have refreshed the key since the read lock was released
        if store.get(key).is_some_and(|e| !e.is_fresh(now)) {
            store.remove(key);
            tracing::debug!(key = %key, "Evicted expired cache entry");
        }
    }
}

impl<V> Default for InMemoryResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> ResponseCache<V> for InMemoryResponseCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_millis();
        let store = self.store.read().await;
        let entry = store.get(key)?;

        if entry.is_fresh(now) {
            return Some(entry.value.clone());
        }

        drop(store);
        self.evict_if_stale(key, now).await;
        None
    }

    async fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let stored_at = self.clock.now_millis();
        let expires_at = stored_at.saturating_add(Self::ttl_millis(ttl));

        let mut store = self.store.write().await;
        store.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at,
                expires_at,
            },
        );
    }

    async fn has(&self, key: &str) -> bool {
        let now = self.clock.now_millis();
        let fresh = match self.store.read().await.get(key) {
            Some(entry) => entry.is_fresh(now),
            None => return false,
        };

        if !fresh {
            self.evict_if_stale(key, now).await;
        }
        fresh
    }

    async fn delete(&self, key: &str) {
        self.store.write().await.remove(key);
    }

    async fn cleanup(&self) -> usize {
        let now = self.clock.now_millis();
        let mut store = self.store.write().await;
        let before = store.len();
        store.retain(|_, entry| entry.is_fresh(now));
        let evicted = before - store.len();

        if evicted > 0 {
            tracing::info!(evicted, remaining = store.len(), "Cache cleanup evicted expired entries");
        }
        evicted
    }

    async fn status(&self) -> CacheStatus {
        let now = self.clock.now_millis();
        let store = self.store.read().await;
        let valid_entries = store.values().filter(|e| e.is_fresh(now)).count();
        let mut keys: Vec<String> = store.keys().cloned().collect();
        keys.sort();

        CacheStatus {
            total_entries: store.len(),
            valid_entries,
            expired_entries: store.len() - valid_entries,
            keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> InMemoryResponseCache<String> {
        InMemoryResponseCache::with_clock(DEFAULT_TTL, Clock::at(0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_and_get() {
        let cache = cache();
        cache.set("key1", "value1".to_string(), None).await;
        assert_eq!(cache.get("key1").await, Some("value1".to_string()));
        assert!(cache.has("key1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = cache();
        cache
            .set("guilds", "[]".to_string(), Some(Duration::from_secs(5)))
            .await;

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert_eq!(cache.get("guilds").await, Some("[]".to_string()));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("guilds").await, None);
        assert!(!cache.has("guilds").await);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_evicts_stale_entry() {
        let cache = cache();
        cache
            .set("user", "bot".to_string(), Some(Duration::from_secs(1)))
            .await;

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.len().await, 1);
        assert!(!cache.has("user").await);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_is_fifteen_minutes() {
        let cache = cache();
        cache.set("key", "value".to_string(), None).await;

        tokio::time::advance(Duration::from_secs(15 * 60 - 1)).await;
        assert!(cache.has("key").await);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!cache.has("key").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_resets_value_and_ttl() {
        let cache = cache();
        cache
            .set("key", "v1".to_string(), Some(Duration::from_secs(1)))
            .await;
        cache
            .set("key", "v2".to_string(), Some(Duration::from_secs(10)))
            .await;

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get("key").await, Some("v2".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_with_shorter_ttl_expires_sooner() {
        let cache = cache();
        cache
            .set("key", "v1".to_string(), Some(Duration::from_secs(10)))
            .await;
        cache
            .set("key", "v2".to_string(), Some(Duration::from_secs(1)))
            .await;

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get("key").await, None);
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = cache();
        cache.set("key1", "value1".to_string(), None).await;
        cache.delete("key1").await;
        assert_eq!(cache.get("key1").await, None);

        // Deleting a missing key is a no-op
        cache.delete("missing").await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_sweeps_only_expired_entries() {
        let cache = cache();
        for i in 0..3 {
            cache
                .set(&format!("short-{i}"), "x".to_string(), Some(Duration::from_secs(1)))
                .await;
        }
        for i in 0..4 {
            cache
                .set(&format!("long-{i}"), "y".to_string(), Some(Duration::from_secs(60)))
                .await;
        }

        tokio::time::advance(Duration::from_secs(2)).await;
        let before = cache.status().await;
        assert_eq!(before.total_entries, 7);
        assert_eq!(before.expired_entries, 3);

        assert_eq!(cache.cleanup().await, 3);

        let after = cache.status().await;
        assert_eq!(after.total_entries, 4);
        assert_eq!(after.valid_entries, 4);
        assert_eq!(after.expired_entries, 0);
        assert!(after.keys.iter().all(|k| k.starts_with("long-")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_age_of_fresh_entry() {
        let cache = cache();
        cache.set("key", "value".to_string(), None).await;
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(cache.age("key").await, Some(Duration::from_secs(3)));
        assert_eq!(cache.age("missing").await, None);
    }

    #[tokio::test]
    async fn test_generic_value_type() {
        let cache: InMemoryResponseCache<Vec<u32>> = InMemoryResponseCache::new();
        cache.set("ids", vec![1, 2, 3], None).await;
        assert_eq!(cache.get("ids").await, Some(vec![1, 2, 3]));
    }
}
