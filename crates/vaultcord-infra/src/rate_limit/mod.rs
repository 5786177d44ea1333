//! Rate limiting for outgoing Discord requests.

mod memory;
mod queue;

pub use memory::{RateLimitConfig, RateLimiter};
