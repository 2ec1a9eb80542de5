//! Client-side pacing: the fixed pause between region requests and the
//! cooldown between cycles. Every suspension can be cut short by shutdown.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Sleep for `duration` unless `cancel` fires first.
///
/// Returns `false` when the sleep was interrupted.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Time left before the next cycle may start.
///
/// Zero when the drain already used up the cooldown budget.
pub fn cooldown_remaining(cycle_start: Instant, cooldown: Duration) -> Duration {
    cooldown.saturating_sub(cycle_start.elapsed())
}

/// Fixed delay applied after each processed region.
pub struct RequestPacer {
    delay: Duration,
}

impl RequestPacer {
    /// Create a pacer that pauses `delay_ms` milliseconds after each request.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
        }
    }

    /// Pause before the next request. Returns `false` if shutdown was requested.
    pub async fn pause(&self, cancel: &CancellationToken) -> bool {
        sleep_or_cancel(self.delay, cancel).await
    }
}
