//! Application state - shared across all handlers.

use std::sync::Arc;

use serde_json::Value;
use vaultcord_core::DiscordError;
use vaultcord_infra::{DiscordClient, InMemoryResponseCache, RateLimiter};

use crate::config::AppConfig;

/// Shared application state.
///
/// The cache and limiter are process-wide: every worker clones handles to the
/// same instances, so per-endpoint quotas and the request queue are global.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<InMemoryResponseCache<Value>>,
    pub limiter: RateLimiter,
    pub discord: DiscordClient,
}

impl AppState {
    /// Build the application state from configuration.
    pub fn new(config: &AppConfig) -> Result<Self, DiscordError> {
        let cache = Arc::new(InMemoryResponseCache::with_default_ttl(
            config.cache_default_ttl,
        ));
        let limiter = RateLimiter::new(config.rate_limit.clone());
        let discord = DiscordClient::new(config.discord.clone(), cache.clone(), limiter.clone())?;

        tracing::info!(
            cache_ttl_secs = config.cache_default_ttl.as_secs(),
            global_per_second = ?config.rate_limit.global_per_second,
            "Application state initialized"
        );

        Ok(Self {
            cache,
            limiter,
            discord,
        })
    }
}
