//! Mock Telemetry Source
//!
//! Generates the same wire lines a real node emits so the whole host
//! pipeline can run without hardware attached.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use telemetry_wire::{SensorRecord, AUDIO_RMS_MISSING};
use tokio::sync::mpsc;
use tracing::info;

/// Mock source tuning
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Record emission rate (Hz)
    pub rate_hz: f64,
    /// Fraction of records emitted without an audio value
    pub audio_dropout: f64,
    /// Largest transport delivery in bytes; lines are split into
    /// random-size chunks up to this bound
    pub max_chunk: usize,
    /// RNG seed, fixed so runs are reproducible
    pub seed: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            rate_hz: 25.0,
            audio_dropout: 0.1,
            max_chunk: 20,
            seed: 42,
        }
    }
}

/// Synthetic node emitting wire-format lines over a channel.
///
/// Motion and temperature follow slow sinusoids with a little noise so
/// the visualization has something to show. Deliveries are fragmented at
/// arbitrary byte boundaries, which is what a real transport does.
pub struct MockSource {
    config: MockConfig,
    rng: StdRng,
    tick: u64,
}

impl MockSource {
    pub fn new(config: MockConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            tick: 0,
        }
    }

    /// Produce the next record
    pub fn next_record(&mut self) -> SensorRecord {
        let period_ms = (1000.0 / self.config.rate_hz) as u64;
        let t = self.tick as f32 * period_ms as f32 / 1000.0;
        let noise = |rng: &mut StdRng| rng.gen_range(-0.02_f32..0.02);

        let audio_rms = if self.rng.gen_bool(self.config.audio_dropout) {
            AUDIO_RMS_MISSING
        } else {
            60.0 + 40.0 * (t * 0.7).sin().abs()
        };

        let record = SensorRecord {
            timestamp_ms: (self.tick * period_ms) as u32,
            accel: [
                0.1 * (t * 1.3).sin() + noise(&mut self.rng),
                0.1 * (t * 0.9).cos() + noise(&mut self.rng),
                1.0 + noise(&mut self.rng),
            ],
            gyro: [
                2.0 * (t * 0.5).sin() + noise(&mut self.rng),
                2.0 * (t * 0.4).cos() + noise(&mut self.rng),
                noise(&mut self.rng),
            ],
            temp_c: 24.0 + 1.5 * (t * 0.05).sin(),
            audio_rms,
        };
        self.tick += 1;
        record
    }

    /// Emit records at the configured rate until the receiver is dropped
    pub async fn run(mut self, tx: mpsc::Sender<Vec<u8>>) {
        let interval = std::time::Duration::from_secs_f64(1.0 / self.config.rate_hz);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(rate_hz = self.config.rate_hz, "mock source started");
        loop {
            ticker.tick().await;
            let line = format!("{}\n", self.next_record().to_csv_line());
            let mut bytes = line.as_bytes();
            while !bytes.is_empty() {
                let take = self.rng.gen_range(1..=self.config.max_chunk.min(bytes.len()));
                let (chunk, rest) = bytes.split_at(take);
                if tx.send(chunk.to_vec()).await.is_err() {
                    info!("mock source stopped");
                    return;
                }
                bytes = rest;
            }
        }
    }
}
