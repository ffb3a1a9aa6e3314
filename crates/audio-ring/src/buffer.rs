//! Audio Ring Buffer Implementation

use crate::DEFAULT_CAPACITY;
use std::sync::Mutex;

struct Inner {
    /// Pre-allocated storage
    storage: Box<[i16]>,
    /// Write cursor (modulo capacity)
    write: usize,
    /// Read cursor (modulo capacity)
    read: usize,
    /// Samples dropped to overflow since creation
    overruns: u64,
}

impl Inner {
    fn available(&self, capacity: usize) -> usize {
        (self.write + capacity - self.read) % capacity
    }
}

/// Fixed-capacity SPSC ring of audio samples.
///
/// The capture callback writes, the sampler consumes. Cursor updates happen
/// inside one short critical section, the host-side equivalent of masking
/// interrupts around the cursor pair on the node. One slot is kept free to
/// distinguish full from empty, so usable capacity is `capacity - 1`.
pub struct AudioRingBuffer {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl AudioRingBuffer {
    /// Create a ring with the given slot count
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "ring needs at least two slots");
        Self {
            inner: Mutex::new(Inner {
                storage: vec![0i16; capacity].into_boxed_slice(),
                write: 0,
                read: 0,
                overruns: 0,
            }),
            capacity,
        }
    }

    /// Create a ring with default capacity (4096 samples)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Write one sample. Always succeeds: a full ring drops its oldest
    /// unread sample so the capture side never blocks.
    pub fn write(&self, sample: i16) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        self.write_locked(&mut inner, sample);
    }

    /// Write a whole capture frame under one critical section
    pub fn write_burst(&self, samples: &[i16]) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        for &s in samples {
            self.write_locked(&mut inner, s);
        }
    }

    fn write_locked(&self, inner: &mut Inner, sample: i16) {
        let write = inner.write;
        inner.storage[write] = sample;
        inner.write = (write + 1) % self.capacity;
        // Producer wins: evict the oldest unread sample on overflow
        if inner.write == inner.read {
            inner.read = (inner.read + 1) % self.capacity;
            inner.overruns += 1;
        }
    }

    /// Consume exactly `window` samples and return their RMS.
    ///
    /// Returns `None` without consuming anything when fewer than `window`
    /// unread samples are available.
    pub fn consume_window(&self, window: usize) -> Option<f32> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.available(self.capacity) < window {
            return None;
        }
        let mut sum_sq = 0.0f64;
        for _ in 0..window {
            let s = inner.storage[inner.read];
            inner.read = (inner.read + 1) % self.capacity;
            sum_sq += f64::from(s) * f64::from(s);
        }
        Some((sum_sq / window as f64).sqrt() as f32)
    }

    /// Unread samples currently buffered
    pub fn available(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.available(self.capacity)
    }

    /// Samples dropped to overflow since creation
    pub fn overruns(&self) -> u64 {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.overruns
    }

    /// Total slot count
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all unread samples
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.read = inner.write;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RMS_WINDOW_SAMPLES;

    #[test]
    fn test_insufficient_samples_returns_none() {
        let ring = AudioRingBuffer::new(64);
        for i in 0..10 {
            ring.write(i);
        }
        assert_eq!(ring.consume_window(20), None);
        // No side effects on the insufficient path
        assert_eq!(ring.available(), 10);
    }

    #[test]
    fn test_consume_exactly_window() {
        let ring = AudioRingBuffer::new(64);
        for _ in 0..30 {
            ring.write(100);
        }
        let rms = ring.consume_window(20).unwrap();
        assert!((rms - 100.0).abs() < 1e-3);
        assert_eq!(ring.available(), 10);
    }

    #[test]
    fn test_sine_rms_is_amplitude_over_sqrt2() {
        let ring = AudioRingBuffer::with_default_capacity();
        let amplitude = 10_000.0f64;
        // One full cycle per 160-sample window keeps the mean exact
        for i in 0..RMS_WINDOW_SAMPLES {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / RMS_WINDOW_SAMPLES as f64;
            ring.write((amplitude * phase.sin()).round() as i16);
        }
        let rms = f64::from(ring.consume_window(RMS_WINDOW_SAMPLES).unwrap());
        let expected = amplitude / 2.0f64.sqrt();
        assert!(
            (rms - expected).abs() / expected < 0.01,
            "rms {} vs expected {}",
            rms,
            expected
        );
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let ring = AudioRingBuffer::new(8); // 7 usable slots
        for i in 0..20i16 {
            ring.write(i);
        }
        assert_eq!(ring.available(), 7);
        assert_eq!(ring.overruns(), 13);
        // Oldest surviving sample is 13
        let rms = ring.consume_window(1).unwrap();
        assert!((rms - 13.0).abs() < 1e-3);
    }

    #[test]
    fn test_write_burst_matches_individual_writes() {
        let a = AudioRingBuffer::new(64);
        let b = AudioRingBuffer::new(64);
        let frame: Vec<i16> = (0..32).map(|i| i * 3 - 40).collect();
        a.write_burst(&frame);
        for &s in &frame {
            b.write(s);
        }
        assert_eq!(a.consume_window(32), b.consume_window(32));
    }

    proptest::proptest! {
        #[test]
        fn prop_available_never_exceeds_usable_capacity(
            writes in proptest::collection::vec(-1000i16..1000, 0..200),
            window in 1usize..32,
        ) {
            let ring = AudioRingBuffer::new(32);
            for s in writes {
                ring.write(s);
            }
            let avail = ring.available();
            proptest::prop_assert!(avail <= ring.capacity() - 1);
            match ring.consume_window(window) {
                Some(_) => proptest::prop_assert_eq!(ring.available(), avail - window),
                None => proptest::prop_assert!(avail < window),
            }
        }
    }

    #[test]
    fn test_concurrent_capture_and_consume() {
        use std::sync::Arc;
        let ring = Arc::new(AudioRingBuffer::with_default_capacity());
        let producer = {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                for i in 0..50_000i32 {
                    ring.write((i % 1000) as i16);
                }
            })
        };
        let consumer = {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                let mut windows = 0;
                for _ in 0..10_000 {
                    if let Some(rms) = ring.consume_window(160) {
                        assert!(rms >= 0.0);
                        windows += 1;
                    }
                }
                windows
            })
        };
        producer.join().unwrap();
        consumer.join().unwrap();
    }
}
