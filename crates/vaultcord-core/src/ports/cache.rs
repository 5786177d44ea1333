use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Time-boxed response cache - memoizes upstream responses under string keys.
///
/// Every operation is total: a miss is `None`/`false`, never an error.
/// An entry is only observable while it is fresh; stale entries are evicted
/// lazily on read or by [`ResponseCache::cleanup`].
#[async_trait]
pub trait ResponseCache<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Get a fresh value, evicting the entry if it has expired.
    async fn get(&self, key: &str) -> Option<V>;

    /// Insert or overwrite a value. `None` uses the cache's default TTL.
    async fn set(&self, key: &str, value: V, ttl: Option<Duration>);

    /// Check whether a fresh value exists, evicting the entry if it has expired.
    async fn has(&self, key: &str) -> bool;

    /// Remove a key. No-op if absent.
    async fn delete(&self, key: &str);

    /// Evict every expired entry and return how many were removed.
    async fn cleanup(&self) -> usize;

    /// Snapshot of the cache contents. Does not evict.
    async fn status(&self) -> CacheStatus;
}

/// Cache diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub keys: Vec<String>,
}
