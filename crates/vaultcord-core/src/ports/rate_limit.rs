//! Rate limiting port.
//!
//! Quota state is learned from upstream response metadata and is trusted as
//! reported: implementations never decrement `remaining` on their own.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Quota state last reported by the upstream API for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Requests left in the current window.
    pub remaining: u32,
    /// Epoch milliseconds at which the quota replenishes.
    pub reset_at: i64,
    /// Maximum requests per window (informational).
    pub limit: u32,
}

impl RateLimitRecord {
    /// A record is stale once its reset time has been reached.
    pub fn is_stale(&self, now_millis: i64) -> bool {
        now_millis >= self.reset_at
    }

    /// How long a caller must wait before this endpoint may be called.
    pub fn wait_time(&self, now_millis: i64) -> Duration {
        if self.remaining > 0 || self.is_stale(now_millis) {
            return Duration::ZERO;
        }
        let wait = self.reset_at.saturating_sub(now_millis).max(0);
        Duration::from_millis(u64::try_from(wait).unwrap_or(0))
    }
}

/// Per-endpoint state derived from the last known record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitState {
    /// No record; calls are permitted unconditionally.
    Unknown,
    /// Quota left, or the previous window has elapsed.
    Available,
    /// Quota exhausted until the window resets.
    Throttled { wait: Duration },
}

impl RateLimitState {
    pub fn is_permitted(&self) -> bool {
        !matches!(self, RateLimitState::Throttled { .. })
    }
}

/// Tracks per-endpoint quota reported by the upstream API.
#[async_trait]
pub trait QuotaTracker: Send + Sync {
    /// Overwrite the record for `endpoint` with upstream-reported values.
    async fn update_rate_limit(&self, endpoint: &str, remaining: u32, reset_at: i64, limit: u32);

    /// Current state of `endpoint`. Stale records are evicted first.
    async fn state(&self, endpoint: &str) -> RateLimitState;

    /// Whether a call to `endpoint` may run now.
    async fn can_make_request(&self, endpoint: &str) -> bool {
        self.state(endpoint).await.is_permitted()
    }

    /// Time until `endpoint` may be called; zero when unrestricted.
    async fn wait_time(&self, endpoint: &str) -> Duration {
        match self.state(endpoint).await {
            RateLimitState::Throttled { wait } => wait,
            _ => Duration::ZERO,
        }
    }
}

/// Request queue diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queue_length: usize,
    pub is_processing: bool,
    pub rate_limits: BTreeMap<String, RateLimitRecord>,
}

/// Failures of the request queue itself. A task's own failure is never one of these.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimitError {
    /// The task was dropped before settling: it panicked or the runtime shut down.
    #[error("Queued request was dropped before it settled")]
    TaskDropped,
}
