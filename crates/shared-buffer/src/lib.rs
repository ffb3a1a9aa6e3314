//! Shared Record Buffer
//!
//! Bounded, indexed circular store feeding multiple independent consumers.
//! Each consumer holds only an integer cursor into a monotonic index space,
//! so eviction never invalidates consumer state; it only surfaces as drop
//! detection on the next read.

mod buffer;

pub use buffer::{BufferStats, ReadOutcome, SharedBuffer, DEFAULT_CAPACITY};
