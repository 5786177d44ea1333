//! Ports - trait definitions for the Discord API access layer.
//! These are the "interfaces" that infrastructure must implement.

mod cache;
mod rate_limit;

pub use cache::{CacheStatus, ResponseCache};
pub use rate_limit::{QueueStatus, QuotaTracker, RateLimitError, RateLimitRecord, RateLimitState};
