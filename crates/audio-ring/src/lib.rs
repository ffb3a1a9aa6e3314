//! Audio Sample Ring Buffer
//!
//! Fixed-capacity circular store for signed 16-bit microphone samples,
//! written from the capture callback and drained by the periodic RMS
//! extractor. The producer never blocks: on overflow the oldest unread
//! sample is dropped.

mod buffer;

pub use buffer::AudioRingBuffer;

/// Default capacity: 4096 samples, about 256 ms at 16 kHz
pub const DEFAULT_CAPACITY: usize = 4096;

/// Capture sample rate assumed by the default sizing (Hz)
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// RMS window size: 160 samples, one 10 ms frame at 16 kHz
pub const RMS_WINDOW_SAMPLES: usize = 160;
