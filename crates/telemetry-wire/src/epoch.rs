//! Device Timestamp Epoch Tracking

use tracing::info;

/// Threshold for treating a backwards jump as a wraparound rather than
/// reordering. The device counter wraps roughly every 49.7 days; anything
/// jumping back by more than half the range is a new epoch.
const WRAP_THRESHOLD: u32 = u32::MAX / 2;

/// Extends wrapping 32-bit device timestamps into a monotonic 64-bit space.
///
/// A large negative delta between consecutive timestamps means the device
/// counter wrapped (or the node rebooted); either way the host starts a new
/// epoch instead of reporting an error.
#[derive(Debug, Default)]
pub struct EpochClock {
    epoch: u64,
    last: Option<u32>,
}

impl EpochClock {
    /// Create a clock with no epoch history
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a device timestamp into the extended monotonic space
    pub fn extend(&mut self, timestamp_ms: u32) -> u64 {
        if let Some(last) = self.last {
            if last > timestamp_ms && last - timestamp_ms > WRAP_THRESHOLD {
                self.epoch += 1;
                info!(epoch = self.epoch, "device timestamp wrapped, new epoch");
            }
        }
        self.last = Some(timestamp_ms);
        (self.epoch << 32) | u64::from(timestamp_ms)
    }

    /// Number of wraparounds observed
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}
