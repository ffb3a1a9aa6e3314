//! Indexed Circular Buffer Implementation

use std::sync::Mutex;
use std::time::Instant;
use telemetry_wire::SensorRecord;
use tracing::debug;

/// Default capacity (1000 records, about 40 seconds at the 25 Hz link rate)
pub const DEFAULT_CAPACITY: usize = 1000;

/// Result of a cursor read
#[derive(Debug)]
pub struct ReadOutcome {
    /// Records in index order
    pub records: Vec<SensorRecord>,
    /// Cursor to pass to the next read
    pub next_cursor: u64,
    /// True when the cursor had fallen behind the oldest retained record
    pub dropped: bool,
}

/// Buffer health snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferStats {
    /// Records currently retained
    pub fill_level: usize,
    /// Total records ever appended
    pub total_appended: u64,
    /// Instantaneous ingestion rate (Hz), from the last append interval
    pub sample_rate_hz: f64,
}

struct Inner {
    /// Pre-allocated storage, slot for index i is `i % capacity`
    storage: Box<[SensorRecord]>,
    /// Monotonic count of appends; next record gets this index
    write_index: u64,
    last_append: Option<Instant>,
    sample_rate_hz: f64,
}

/// Bounded multi-consumer record store.
///
/// Eviction and drop detection are pure index arithmetic over a fixed
/// array: `base_index = write_index - min(write_index, capacity)` marks the
/// oldest retained record, and a cursor below it means that consumer lost
/// data. The lock is held only to mutate or snapshot the container, never
/// across I/O or consumer-side work, so a slow consumer cannot stall the
/// producer.
pub struct SharedBuffer {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl SharedBuffer {
    /// Create a buffer retaining up to `capacity` records
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be non-zero");
        Self {
            inner: Mutex::new(Inner {
                storage: vec![SensorRecord::default(); capacity].into_boxed_slice(),
                write_index: 0,
                last_append: None,
                sample_rate_hz: 0.0,
            }),
            capacity,
        }
    }

    /// Create a buffer with the default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Append one record, evicting the oldest when full. O(1).
    pub fn append(&self, record: SensorRecord) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let slot = (inner.write_index % self.capacity as u64) as usize;
        inner.storage[slot] = record;
        inner.write_index += 1;

        let now = Instant::now();
        if let Some(last) = inner.last_append {
            let dt = now.duration_since(last).as_secs_f64();
            if dt > 0.0 {
                inner.sample_rate_hz = 1.0 / dt;
            }
        }
        inner.last_append = Some(now);
    }

    /// Read all records at or after `cursor`.
    ///
    /// When the cursor has fallen behind the oldest retained record the
    /// read starts at `base_index` instead and `dropped` is set; the
    /// returned `next_cursor` always jumps to the current write index, so
    /// loss is signaled once rather than replaying stale data.
    pub fn read_since(&self, cursor: u64) -> ReadOutcome {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let write_index = inner.write_index;
        let base_index = write_index.saturating_sub(self.capacity as u64);

        let dropped = cursor < base_index;
        let start = cursor.max(base_index);
        if dropped {
            debug!(cursor, base_index, "consumer cursor fell behind, data lost");
        }

        let records = (start..write_index)
            .map(|i| inner.storage[(i % self.capacity as u64) as usize])
            .collect();

        ReadOutcome {
            records,
            next_cursor: write_index,
            dropped,
        }
    }

    /// Current monotonic write index (the next record's index)
    pub fn write_index(&self) -> u64 {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.write_index
    }

    /// Index of the oldest retained record
    pub fn base_index(&self) -> u64 {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.write_index.saturating_sub(self.capacity as u64)
    }

    /// Maximum retained records
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Health snapshot
    pub fn stats(&self) -> BufferStats {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let base = inner.write_index.saturating_sub(self.capacity as u64);
        BufferStats {
            fill_level: (inner.write_index - base) as usize,
            total_appended: inner.write_index,
            sample_rate_hz: inner.sample_rate_hz,
        }
    }
}
