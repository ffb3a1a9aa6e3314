//! Transport Ingestion

use shared_buffer::SharedBuffer;
use std::sync::Arc;
use telemetry_wire::{EpochClock, LineReassembler, ReassemblerEvent};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Counters from one ingestion run
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestStats {
    /// Records appended to the shared buffer
    pub records: u64,
    /// Lines skipped as unparseable
    pub parse_errors: u64,
    /// Reassembler resynchronizations
    pub resyncs: u64,
    /// Device timestamp epochs observed (wraps or reboots)
    pub epochs: u64,
    /// Most recent device timestamp in the epoch-extended 64-bit space
    pub last_timestamp: u64,
}

/// Drain raw transport deliveries into the shared buffer.
///
/// Runs until the sender side of `rx` is dropped, which is how ingestion
/// is torn down. Malformed records are counted and skipped, never fatal.
pub async fn run_ingest(
    mut rx: mpsc::Receiver<Vec<u8>>,
    buffer: Arc<SharedBuffer>,
) -> IngestStats {
    let mut reassembler = LineReassembler::default();
    let mut epoch = EpochClock::new();
    let mut stats = IngestStats::default();

    info!("transport ingestion started");
    while let Some(chunk) = rx.recv().await {
        for event in reassembler.push(&chunk) {
            match event {
                ReassemblerEvent::Record(record) => {
                    stats.last_timestamp = epoch.extend(record.timestamp_ms);
                    buffer.append(record);
                    stats.records += 1;
                }
                ReassemblerEvent::ParseError(err) => {
                    stats.parse_errors += 1;
                    warn!(error = %err, "skipping malformed record");
                }
                ReassemblerEvent::Resync { discarded_bytes } => {
                    stats.resyncs += 1;
                    warn!(discarded_bytes, "reassembler resynchronized");
                }
            }
        }
    }
    stats.epochs = epoch.epoch();
    info!(
        records = stats.records,
        parse_errors = stats.parse_errors,
        resyncs = stats.resyncs,
        "transport ingestion finished"
    );
    stats
}
