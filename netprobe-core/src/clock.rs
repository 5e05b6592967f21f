//! Monotonic timing helpers
//!
//! All probe durations are taken from `Instant`, never from wall-clock time,
//! so NTP adjustments or manual clock changes cannot skew a measurement.

use std::time::{Duration, Instant};

/// Time elapsed since `start`, clamped to zero.
pub fn elapsed(start: Instant) -> Duration {
    Instant::now().saturating_duration_since(start)
}

/// Simple stopwatch started at construction
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn started_at(&self) -> Instant {
        self.start
    }

    pub fn elapsed(&self) -> Duration {
        elapsed(self.start)
    }

    /// Elapsed time in whole milliseconds (truncated)
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    pub fn elapsed_secs_f64(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Whether at least `window` has passed since the stopwatch started
    pub fn has_reached(&self, window: Duration) -> bool {
        self.elapsed() >= window
    }
}
