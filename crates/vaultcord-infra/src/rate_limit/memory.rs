//! In-memory Discord rate limiter with a single global request queue.
//!
//! Quota records come from upstream response headers via
//! [`QuotaTracker::update_rate_limit`] and are trusted as reported: the limiter
//! does not decrement `remaining` itself. Every queued request runs strictly
//! after the previous one settled, whatever its endpoint.
//! Note: State is per-process, not shared across instances.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;

use vaultcord_core::Clock;
use vaultcord_core::ports::{
    QueueStatus, QuotaTracker, RateLimitError, RateLimitRecord, RateLimitState,
};

use super::queue::{QueueState, QueuedTask, process_queue};

#[cfg(feature = "global-limit")]
type DirectRateLimiter = governor::DefaultDirectRateLimiter;

/// Discord allows 50 requests per second per bot across all routes.
const DISCORD_GLOBAL_PER_SECOND: u32 = 50;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Process-wide ceiling applied on top of per-endpoint quotas. `None` disables it.
    pub global_per_second: Option<u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_second: Some(DISCORD_GLOBAL_PER_SECOND),
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from environment variables. `0` disables the global ceiling.
    pub fn from_env() -> Self {
        let global_per_second = match std::env::var("RATE_LIMIT_GLOBAL_PER_SECOND") {
            Ok(value) => value.parse::<u32>().ok().map_or(
                Some(DISCORD_GLOBAL_PER_SECOND),
                |n| (n > 0).then_some(n),
            ),
            Err(_) => Some(DISCORD_GLOBAL_PER_SECOND),
        };
        Self { global_per_second }
    }
}

/// State shared between the limiter handles and the queue processor.
pub(crate) struct Shared {
    records: RwLock<HashMap<String, RateLimitRecord>>,
    queue: Mutex<QueueState>,
    clock: Clock,
    /// Runtime the limiter was built on; the processor is spawned there.
    runtime: Option<Handle>,
    #[cfg(feature = "global-limit")]
    global: Option<DirectRateLimiter>,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pop the head task, or mark the processor idle if there is none.
    pub(crate) fn next_task(&self) -> Option<QueuedTask> {
        let mut queue = self.queue();
        let task = queue.tasks.pop_front();
        if task.is_none() {
            queue.processing = false;
        }
        task
    }

    /// The processor was dropped with work left; let the next enqueue restart it.
    pub(crate) fn processor_lost(&self) {
        let mut queue = self.queue();
        queue.processing = false;
        tracing::warn!(
            queue_length = queue.tasks.len(),
            "Request queue processor stopped before draining the queue"
        );
    }

    fn spawn_processor(self: &Arc<Self>) {
        let processor = process_queue(self.clone());
        match &self.runtime {
            Some(runtime) => {
                runtime.spawn(processor);
            }
            None => {
                tokio::spawn(processor);
            }
        }
    }

    fn update(&self, endpoint: &str, record: RateLimitRecord) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(endpoint.to_string(), record);
    }

    pub(crate) fn state(&self, endpoint: &str) -> RateLimitState {
        let now = self.clock.now_millis();
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);

        let Some(record) = records.get(endpoint) else {
            return RateLimitState::Unknown;
        };

        if record.is_stale(now) {
            records.remove(endpoint);
            tracing::debug!(endpoint = %endpoint, "Rate limit window reset, record discarded");
            return RateLimitState::Available;
        }

        if record.remaining > 0 {
            RateLimitState::Available
        } else {
            RateLimitState::Throttled {
                wait: record.wait_time(now),
            }
        }
    }

    pub(crate) fn wait_time(&self, endpoint: &str) -> Duration {
        match self.state(endpoint) {
            RateLimitState::Throttled { wait } => wait,
            _ => Duration::ZERO,
        }
    }

    pub(crate) async fn acquire_global_permit(&self) {
        #[cfg(feature = "global-limit")]
        if let Some(global) = &self.global {
            global.until_ready().await;
        }
    }
}

/// Per-endpoint quota tracker and serialized request queue.
///
/// Cloning is cheap; clones share the same records and queue.
#[derive(Clone)]
pub struct RateLimiter {
    shared: Arc<Shared>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Clock::new())
    }

    pub fn with_clock(config: RateLimitConfig, clock: Clock) -> Self {
        #[cfg(feature = "global-limit")]
        let global = config
            .global_per_second
            .and_then(std::num::NonZeroU32::new)
            .map(|per_second| DirectRateLimiter::direct(governor::Quota::per_second(per_second)));

        #[cfg(not(feature = "global-limit"))]
        if config.global_per_second.is_some() {
            tracing::debug!("global-limit feature disabled, ignoring global ceiling");
        }

        Self {
            shared: Arc::new(Shared {
                records: RwLock::new(HashMap::new()),
                queue: Mutex::new(QueueState::default()),
                clock,
                runtime: Handle::try_current().ok(),
                #[cfg(feature = "global-limit")]
                global,
            }),
        }
    }

    pub fn clock(&self) -> Clock {
        self.shared.clock
    }

    /// Append `operation` to the global FIFO queue and return its eventual result.
    ///
    /// The task is enqueued before this returns, so calls made in sequence run
    /// in that order. It waits out any throttle on `endpoint`, then runs once;
    /// its `Ok`/`Err` is passed back unchanged. Dropping the returned future
    /// does not cancel the task.
    ///
    /// The queue processor runs on the runtime the limiter was built on, so
    /// callers on short-lived runtimes cannot take it down with them. A limiter
    /// built outside any runtime uses the caller's runtime instead, which must
    /// then exist.
    pub fn queue_request<T, E, F, Fut>(
        &self,
        endpoint: impl Into<String>,
        operation: F,
    ) -> impl Future<Output = Result<T, E>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: From<RateLimitError> + Display + Send + 'static,
    {
        let endpoint = endpoint.into();
        let (task, settled) = QueuedTask::new(endpoint.clone(), operation);

        let start_processor = {
            let mut queue = self.shared.queue();
            queue.tasks.push_back(task);
            tracing::debug!(endpoint = %endpoint, queue_length = queue.tasks.len(), "Request queued");
            !std::mem::replace(&mut queue.processing, true)
        };

        if start_processor {
            self.shared.spawn_processor();
        }

        async move {
            settled
                .await
                .map_err(|_| E::from(RateLimitError::TaskDropped))?
        }
    }

    /// Queue length, processor flag and a snapshot of known quota records.
    pub fn queue_status(&self) -> QueueStatus {
        let (queue_length, is_processing) = {
            let queue = self.shared.queue();
            (queue.tasks.len(), queue.processing)
        };
        let rate_limits = self
            .shared
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(endpoint, record)| (endpoint.clone(), *record))
            .collect();

        QueueStatus {
            queue_length,
            is_processing,
            rate_limits,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[async_trait]
impl QuotaTracker for RateLimiter {
    async fn update_rate_limit(&self, endpoint: &str, remaining: u32, reset_at: i64, limit: u32) {
        tracing::debug!(endpoint = %endpoint, remaining, reset_at, limit, "Rate limit updated");
        self.shared.update(
            endpoint,
            RateLimitRecord {
                remaining,
                reset_at,
                limit,
            },
        );
    }

    async fn state(&self, endpoint: &str) -> RateLimitState {
        self.shared.state(endpoint)
    }
}
