//! # Vaultcord Infrastructure
//!
//! Concrete implementations of the ports defined in `vaultcord-core`.
//! This crate contains the in-memory response cache, the Discord rate
//! limiter with its global request queue, and the Discord REST client.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - Cache and per-endpoint limiter only
//! - `discord` - Discord REST client via reqwest
//! - `global-limit` - Process-wide requests-per-second ceiling via governor

pub mod cache;
pub mod rate_limit;

#[cfg(feature = "discord")]
pub mod discord;

pub use cache::InMemoryResponseCache;
pub use rate_limit::{RateLimitConfig, RateLimiter};

#[cfg(feature = "discord")]
pub use discord::{DiscordClient, DiscordConfig, RateLimitHeaders};
