//! Visualization Consumer

use shared_buffer::SharedBuffer;
use std::collections::VecDeque;
use std::sync::Arc;
use telemetry_wire::SensorRecord;
use tracing::debug;

/// Visualization poller tuning
#[derive(Debug, Clone)]
pub struct VizConfig {
    /// Poll rate (Hz)
    pub poll_hz: f64,
    /// Records kept for the on-screen window
    pub window_len: usize,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            poll_hz: 15.0,
            window_len: 500,
        }
    }
}

/// Fixed-cadence display feed with its own cursor.
///
/// Buffer overruns are a display condition here, not an error: the poller
/// keeps going with whatever is retained and raises a sticky gap flag for
/// the UI to show.
pub struct VisualizationPoller {
    buffer: Arc<SharedBuffer>,
    config: VizConfig,
    cursor: u64,
    window: VecDeque<SensorRecord>,
    gap_occurred: bool,
}

impl VisualizationPoller {
    /// Create a poller starting at the buffer's current write index
    pub fn new(buffer: Arc<SharedBuffer>, config: VizConfig) -> Self {
        let cursor = buffer.write_index();
        Self {
            buffer,
            config,
            cursor,
            window: VecDeque::new(),
            gap_occurred: false,
        }
    }

    /// Pull everything new into the display window; returns the number of
    /// new records
    pub fn poll(&mut self) -> usize {
        let out = self.buffer.read_since(self.cursor);
        if out.dropped {
            self.gap_occurred = true;
            debug!(cursor = self.cursor, "display gap");
        }
        self.cursor = out.next_cursor;

        let count = out.records.len();
        for record in out.records {
            if self.window.len() == self.config.window_len {
                self.window.pop_front();
            }
            self.window.push_back(record);
        }
        count
    }

    /// Records currently in the display window, oldest first
    pub fn window(&self) -> impl Iterator<Item = &SensorRecord> {
        self.window.iter()
    }

    /// Whether any gap has occurred since the indicator was last cleared
    pub fn gap_occurred(&self) -> bool {
        self.gap_occurred
    }

    /// Clear the gap indicator (e.g. after the UI acknowledged it)
    pub fn clear_gap(&mut self) {
        self.gap_occurred = false;
    }

    /// Poll interval derived from the configured rate
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.config.poll_hz)
    }
}
