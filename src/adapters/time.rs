//! Host time adapter.
//!
//! Provides the wrapping millisecond counter and a blocking delay on top of
//! `std::time`, for the simulator and host-side tests.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

use crate::app::ports::ClockPort;

/// Milliseconds since construction, truncated to `u32` so it wraps the
/// same way the firmware tick counter does.
pub struct MonotonicClock {
    start: Instant,
    offset_ms: u32,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Start counting from `offset_ms` instead of zero, e.g. just below
    /// `u32::MAX` to exercise counter wrap.
    pub fn starting_at(offset_ms: u32) -> Self {
        Self {
            start: Instant::now(),
            offset_ms,
        }
    }
}

impl ClockPort for MonotonicClock {
    fn now_ms(&self) -> u32 {
        (self.start.elapsed().as_millis() as u32).wrapping_add(self.offset_ms)
    }
}

/// `thread::sleep`-backed delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
