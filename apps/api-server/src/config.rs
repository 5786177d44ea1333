//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use vaultcord_infra::cache::DEFAULT_TTL;
use vaultcord_infra::{DiscordConfig, RateLimitConfig};

/// Six-field cron expression: every five minutes.
const DEFAULT_CLEANUP_SCHEDULE: &str = "0 */5 * * * *";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub discord: DiscordConfig,
    pub rate_limit: RateLimitConfig,
    /// TTL for cache writes that do not choose their own.
    pub cache_default_ttl: Duration,
    /// Cron schedule of the periodic cache sweep.
    pub cache_cleanup_schedule: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let discord = DiscordConfig::from_env();
        if discord.bot_token.is_none() {
            tracing::warn!("DISCORD_BOT_TOKEN not set. Discord routes will answer 503.");
        }

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            discord,
            rate_limit: RateLimitConfig::from_env(),
            cache_default_ttl: env::var("CACHE_DEFAULT_TTL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TTL),
            cache_cleanup_schedule: env::var("CACHE_CLEANUP_SCHEDULE")
                .unwrap_or_else(|_| DEFAULT_CLEANUP_SCHEDULE.to_string()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            discord: DiscordConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache_default_ttl: DEFAULT_TTL,
            cache_cleanup_schedule: DEFAULT_CLEANUP_SCHEDULE.to_string(),
        }
    }
}
