//! Monotonic time adapter.
//!
//! The service and flush timer are parameterised on a caller-supplied
//! `now_ms` value, so tests drive time explicitly.  The host runner uses
//! this adapter, backed by `std::time::Instant`, as the single clock for
//! both the event path and the timer pump.

/// Monotonic millisecond clock.
pub struct MonotonicClock {
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Milliseconds since the clock was created (monotonic).
    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
