//! Recording Worker
//!
//! Dedicated task draining the shared buffer through its own cursor. The
//! live pipeline never waits on it: the worker polls, copies, and does all
//! file I/O on its own schedule.

use crate::writer::{SessionInfo, SessionSink};
use crate::{RecorderConfig, RecorderError};
use shared_buffer::SharedBuffer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Buffer-polling file writer loop for one session
pub struct RecordingWorker {
    buffer: Arc<SharedBuffer>,
    writer: Box<dyn SessionSink>,
    config: RecorderConfig,
    cursor: u64,
    /// Session sample count shared with status queries
    samples: Arc<AtomicU64>,
    gaps: u64,
}

impl RecordingWorker {
    /// Create a worker starting at the given cursor
    pub fn new(
        buffer: Arc<SharedBuffer>,
        writer: Box<dyn SessionSink>,
        config: RecorderConfig,
        start_cursor: u64,
        samples: Arc<AtomicU64>,
    ) -> Self {
        Self {
            buffer,
            writer,
            config,
            cursor: start_cursor,
            samples,
            gaps: 0,
        }
    }

    /// Run until `stop` flips, then do one final drain and durable flush.
    ///
    /// Storage failures end the session here; the producer and the
    /// visualization path never see them.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> Result<SessionInfo, RecorderError> {
        info!(cursor = self.cursor, "recording worker started");
        let started = Instant::now();
        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_flush = Instant::now();

        loop {
            tokio::select! {
                changed = stop.changed() => {
                    // A dropped sender means the manager is gone; stop too
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = poll.tick() => {
                    if let Err(e) = self.drain_once(&mut last_flush) {
                        error!(error = %e, "storage failure, ending session");
                        return Err(e);
                    }
                }
            }
        }

        // Final drain-and-flush pass, then the durable close
        self.drain_pass()?;
        if self.gaps > 0 {
            warn!(gaps = self.gaps, "session recorded with data loss");
        }
        self.writer.close(started.elapsed())
    }

    fn drain_once(&mut self, last_flush: &mut Instant) -> Result<(), RecorderError> {
        self.drain_pass()?;

        let rows_due = self.writer.pending_rows() >= self.config.flush_rows;
        let time_due = last_flush.elapsed() >= self.config.flush_interval;
        if rows_due || time_due {
            self.writer.flush(false)?;
            *last_flush = Instant::now();
            debug!(rows_due, time_due, "flushed write buffer");
        }
        Ok(())
    }

    fn drain_pass(&mut self) -> Result<(), RecorderError> {
        let out = self.buffer.read_since(self.cursor);
        if out.dropped {
            // Loss is logged, not fatal; the session continues
            self.gaps += 1;
            warn!(cursor = self.cursor, next = out.next_cursor, "buffer overran recording cursor");
        }
        if !out.records.is_empty() {
            self.writer.append_rows(&out.records);
            self.samples
                .store(self.writer.sample_count(), Ordering::Relaxed);
        }
        self.cursor = out.next_cursor;
        Ok(())
    }
}

/// Sink whose writes fail, standing in for a dead or full disk
#[cfg(test)]
pub(crate) struct FailingSink {
    rows: u64,
}

#[cfg(test)]
impl FailingSink {
    pub(crate) fn new() -> Self {
        Self { rows: 0 }
    }

    fn storage_error() -> RecorderError {
        RecorderError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "simulated disk failure",
        ))
    }
}

#[cfg(test)]
impl SessionSink for FailingSink {
    fn append_rows(&mut self, records: &[telemetry_wire::SensorRecord]) {
        self.rows += records.len() as u64;
    }

    fn pending_rows(&self) -> usize {
        self.rows as usize
    }

    fn sample_count(&self) -> u64 {
        self.rows
    }

    fn flush(&mut self, _force_sync: bool) -> Result<(), RecorderError> {
        Err(Self::storage_error())
    }

    fn close(self: Box<Self>, _duration: std::time::Duration) -> Result<SessionInfo, RecorderError> {
        Err(Self::storage_error())
    }
}
