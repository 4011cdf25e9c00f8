//! Progress emission throttle: time- or percent-triggered.
//!
//! Emits when at least one second passed since the last emission OR progress
//! advanced by at least ten percentage points, whichever triggers first. This
//! bounds event volume on both fast and slow links.

use std::time::{Duration, Instant};

/// Minimum interval between time-triggered emissions.
pub(crate) const EMIT_INTERVAL: Duration = Duration::from_millis(1000);

/// Percentage-point advance that forces an emission regardless of time.
pub(crate) const EMIT_PERCENT_STEP: u64 = 10;

/// Decides when a progress event is due and computes the session speed.
/// Time is passed in explicitly so tests can drive the clock.
#[derive(Debug)]
pub(crate) struct ProgressThrottle {
    last_emit: Instant,
    last_emit_bytes: u64,
}

impl ProgressThrottle {
    pub(crate) fn new(now: Instant, starting_bytes: u64) -> Self {
        Self {
            last_emit: now,
            last_emit_bytes: starting_bytes,
        }
    }

    /// Returns `Some(speed_bytes_per_sec)` when an event is due, updating the
    /// emission baseline; `None` otherwise.
    pub(crate) fn check(&mut self, now: Instant, current_bytes: u64, total_bytes: u64) -> Option<u64> {
        let elapsed = now.saturating_duration_since(self.last_emit);

        let percent_step = total_bytes > 0
            && current_bytes * 100 / total_bytes >= self.last_emit_bytes * 100 / total_bytes + EMIT_PERCENT_STEP;

        if elapsed < EMIT_INTERVAL && !percent_step {
            return None;
        }

        let elapsed_ms = (elapsed.as_millis() as u64).max(1);
        let speed = current_bytes.saturating_sub(self.last_emit_bytes) * 1000 / elapsed_ms;

        self.last_emit = now;
        self.last_emit_bytes = current_bytes;
        Some(speed)
    }
}
