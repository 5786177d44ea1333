//! Epoch-millisecond clock shared by the response cache and the rate limiter.

use std::time::Duration;

use tokio::time::Instant;

/// Wall-clock time in epoch milliseconds, advanced by the runtime's monotonic clock.
///
/// The clock is anchored to `chrono::Utc::now()` when constructed and then
/// moves forward with [`tokio::time::Instant`]. Upstream quota resets are
/// absolute epoch timestamps, while sleeping happens on the runtime clock;
/// deriving one from the other keeps both views consistent, including under
/// a paused test runtime.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    anchor_millis: i64,
    anchor: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self::at(chrono::Utc::now().timestamp_millis())
    }

    /// Clock whose current reading is `epoch_millis`.
    pub fn at(epoch_millis: i64) -> Self {
        Self {
            anchor_millis: epoch_millis,
            anchor: Instant::now(),
        }
    }

    /// Current time in epoch milliseconds.
    pub fn now_millis(&self) -> i64 {
        let elapsed = i64::try_from(self.anchor.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.anchor_millis.saturating_add(elapsed)
    }

    /// Epoch milliseconds `after` from now.
    pub fn millis_after(&self, after: Duration) -> i64 {
        let after = i64::try_from(after.as_millis()).unwrap_or(i64::MAX);
        self.now_millis().saturating_add(after)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
