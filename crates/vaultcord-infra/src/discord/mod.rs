//! Discord REST API access.

mod client;
pub mod headers;

pub use client::{DiscordClient, DiscordConfig};
pub use headers::RateLimitHeaders;
