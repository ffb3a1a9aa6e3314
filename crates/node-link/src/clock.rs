//! Tick Clock Abstraction
//!
//! The node loop and link streamer never read wall time directly; they go
//! through this trait so tests can drive them at a synthetic rate.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Time source for the node's cooperative loop
pub trait Clock {
    /// Milliseconds since the clock's epoch (wraps at 2^32 like the device
    /// uptime counter)
    fn now_ms(&self) -> u32;

    /// Block for `ms` milliseconds (advances synthetic clocks instantly)
    fn sleep_ms(&self, ms: u32);
}

/// Real clock backed by `Instant`
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose epoch is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }

    fn sleep_ms(&self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Synthetic clock for tests: sleeping advances time, nothing blocks
pub struct SimClock {
    now: Cell<u32>,
}

impl SimClock {
    /// Create a synthetic clock starting at `start_ms`
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    /// Advance time without sleeping
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }

    fn sleep_ms(&self, ms: u32) {
        self.advance(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_clock_advances_on_sleep() {
        let clock = SimClock::new(100);
        clock.sleep_ms(50);
        assert_eq!(clock.now_ms(), 150);
        clock.advance(10);
        assert_eq!(clock.now_ms(), 160);
    }

    #[test]
    fn test_sim_clock_wraps() {
        let clock = SimClock::new(u32::MAX - 5);
        clock.advance(10);
        assert_eq!(clock.now_ms(), 4);
    }
}
