//! Cron-style job scheduler using tokio-cron-scheduler.

use std::sync::Arc;

use serde_json::Value;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use vaultcord_core::ports::ResponseCache;
use vaultcord_infra::InMemoryResponseCache;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Enable scheduler.
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

/// Cron job scheduler wrapper.
pub struct Scheduler {
    inner: JobScheduler,
    config: SchedulerConfig,
}

impl Scheduler {
    pub async fn new(config: SchedulerConfig) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, config })
    }

    /// Add a cron job. `schedule` uses six fields, seconds first.
    pub async fn add_cron<F, Fut>(&self, schedule: &str, task: F) -> Result<(), JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(())
    }

    /// Periodically evict expired response cache entries.
    pub async fn register_cache_sweep(
        &self,
        schedule: &str,
        cache: Arc<InMemoryResponseCache<Value>>,
    ) -> Result<(), JobSchedulerError> {
        self.add_cron(schedule, move || {
            let cache = cache.clone();
            async move {
                let evicted = cache.cleanup().await;
                tracing::debug!(evicted, "Scheduled cache sweep finished");
            }
        })
        .await
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if !self.config.enabled {
            tracing::info!("Scheduler disabled");
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }
}
