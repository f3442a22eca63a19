//! Monotonic time sources.
//!
//! Searches measure their per-step budget and the result cache measures
//! expiry against a [`Clock`]. Production code uses [`SystemClock`]; tests
//! drive a [`ManualClock`] forward explicitly.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Monotonic time elapsed since an arbitrary fixed epoch.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Duration;
}

/// Wall-clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock stopped at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Move the clock forward by fractional seconds.
    pub fn advance_secs(&self, secs: f32) {
        self.advance(Duration::from_secs_f32(secs));
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: Duration) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}
