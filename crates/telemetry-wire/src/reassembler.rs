//! Fragment Reassembly
//!
//! The wireless transport delivers records in arbitrarily sized chunks,
//! down to single bytes. The reassembler accumulates deliveries and emits
//! complete terminator-delimited records.

use crate::error::WireError;
use crate::record::SensorRecord;
use crate::RECORD_TERMINATOR;
use tracing::{debug, warn};

/// Typical formatted record length in bytes, used to size the overflow cutoff
const EXPECTED_RECORD_LEN: usize = 64;

/// Reassembler configuration
#[derive(Debug, Clone)]
pub struct ReassemblerConfig {
    /// Maximum accumulated unterminated bytes before the accumulator is
    /// discarded and a resync is signaled (default 4x expected record length)
    pub max_line_len: usize,
}

impl Default for ReassemblerConfig {
    fn default() -> Self {
        Self {
            max_line_len: 4 * EXPECTED_RECORD_LEN,
        }
    }
}

/// Outcome of feeding bytes into the reassembler
#[derive(Debug)]
pub enum ReassemblerEvent {
    /// A complete record was extracted and parsed
    Record(SensorRecord),
    /// A complete line was extracted but failed to parse
    ParseError(WireError),
    /// The accumulator exceeded the safety cutoff and was discarded
    Resync { discarded_bytes: usize },
}

/// Reconstructs terminator-delimited records from fragmented deliveries.
///
/// Leftover bytes are retained indefinitely between deliveries; there is no
/// inter-delivery timeout, only the maximum-line-length cutoff.
pub struct LineReassembler {
    buffer: Vec<u8>,
    config: ReassemblerConfig,
    records_emitted: u64,
    parse_errors: u64,
    resyncs: u64,
}

impl LineReassembler {
    /// Create a reassembler with the given config
    pub fn new(config: ReassemblerConfig) -> Self {
        Self {
            buffer: Vec::with_capacity(config.max_line_len),
            config,
            records_emitted: 0,
            parse_errors: 0,
            resyncs: 0,
        }
    }

    /// Feed one raw delivery, returning all events it completes.
    pub fn push(&mut self, data: &[u8]) -> Vec<ReassemblerEvent> {
        self.buffer.extend_from_slice(data);
        let mut events = Vec::new();

        while let Some(idx) = self
            .buffer
            .iter()
            .position(|&b| b == RECORD_TERMINATOR)
        {
            let mut line: Vec<u8> = self.buffer.drain(..=idx).collect();
            line.pop(); // terminator
            // Node firmware may emit CRLF on the wired channel
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(event) = self.complete_line(&line) {
                events.push(event);
            }
        }

        // Overflow protection: a missing terminator must not grow the
        // accumulator without bound
        if self.buffer.len() > self.config.max_line_len {
            let discarded = self.buffer.len();
            warn!(
                discarded_bytes = discarded,
                "unterminated record exceeded cutoff, resynchronizing"
            );
            self.buffer.clear();
            self.resyncs += 1;
            events.push(ReassemblerEvent::Resync {
                discarded_bytes: discarded,
            });
        }

        events
    }

    fn complete_line(&mut self, line: &[u8]) -> Option<ReassemblerEvent> {
        let text = match std::str::from_utf8(line) {
            Ok(t) => t,
            Err(_) => {
                self.parse_errors += 1;
                return Some(ReassemblerEvent::ParseError(WireError::InvalidUtf8));
            }
        };

        // Empty or comma-only lines are transmission noise, not errors
        if text.trim().is_empty() || text.replace(',', "").trim().is_empty() {
            debug!(line = %text, "skipping noise line");
            return None;
        }

        match SensorRecord::parse_csv(text) {
            Ok(record) => {
                self.records_emitted += 1;
                Some(ReassemblerEvent::Record(record))
            }
            Err(err) => {
                self.parse_errors += 1;
                warn!(line = %text, error = %err, "record parse failed");
                Some(ReassemblerEvent::ParseError(err))
            }
        }
    }

    /// Bytes currently held waiting for a terminator
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Total complete records emitted
    pub fn records_emitted(&self) -> u64 {
        self.records_emitted
    }

    /// Total lines that failed to parse
    pub fn parse_errors(&self) -> u64 {
        self.parse_errors
    }

    /// Total resynchronizations
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }
}

impl Default for LineReassembler {
    fn default() -> Self {
        Self::new(ReassemblerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "1000,0.010,0.020,1.000,1.500,-2.000,0.500,25.00,100.00";

    fn records(events: Vec<ReassemblerEvent>) -> Vec<SensorRecord> {
        events
            .into_iter()
            .filter_map(|e| match e {
                ReassemblerEvent::Record(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_delivery() {
        let mut asm = LineReassembler::default();
        let payload = format!("{}\n", LINE);
        let recs = records(asm.push(payload.as_bytes()));
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].timestamp_ms, 1000);
    }

    #[test]
    fn test_single_byte_deliveries_match_one_delivery() {
        let payload = format!("{}\n", LINE);

        let mut whole = LineReassembler::default();
        let expected = records(whole.push(payload.as_bytes()));

        let mut fragmented = LineReassembler::default();
        let mut got = Vec::new();
        for b in payload.as_bytes() {
            got.extend(records(fragmented.push(std::slice::from_ref(b))));
        }

        assert_eq!(expected.len(), 1);
        assert_eq!(got, expected);
    }

    #[test]
    fn test_split_across_deliveries() {
        let mut asm = LineReassembler::default();
        let payload = format!("{}\n{}\n", LINE, LINE);
        let (a, b) = payload.as_bytes().split_at(payload.len() / 2);
        let mut recs = records(asm.push(a));
        recs.extend(records(asm.push(b)));
        assert_eq!(recs.len(), 2);
        assert_eq!(asm.pending_bytes(), 0);
    }

    #[test]
    fn test_crlf_tolerated() {
        let mut asm = LineReassembler::default();
        let payload = format!("{}\r\n", LINE);
        let recs = records(asm.push(payload.as_bytes()));
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn test_parse_error_does_not_abort_stream() {
        let mut asm = LineReassembler::default();
        let payload = format!("garbage,line\n{}\n", LINE);
        let events = asm.push(payload.as_bytes());
        assert_eq!(asm.parse_errors(), 1);
        assert_eq!(records(events).len(), 1);
    }

    #[test]
    fn test_overlong_accumulator_resyncs() {
        let mut asm = LineReassembler::default();
        let junk = vec![b'x'; 300];
        let events = asm.push(&junk);
        assert!(matches!(
            events.last(),
            Some(ReassemblerEvent::Resync { discarded_bytes: 300 })
        ));
        assert_eq!(asm.pending_bytes(), 0);

        // Stream recovers on the next terminated record
        let payload = format!("{}\n", LINE);
        assert_eq!(records(asm.push(payload.as_bytes())).len(), 1);
    }

    #[test]
    fn test_noise_lines_skipped() {
        let mut asm = LineReassembler::default();
        let events = asm.push(b"\n , ,, \n");
        assert!(events.is_empty());
        assert_eq!(asm.parse_errors(), 0);
    }

    proptest::proptest! {
        /// Chunking must never change what comes out, only when
        #[test]
        fn prop_fragmentation_invariant(chunk_sizes in proptest::collection::vec(1usize..20, 1..64)) {
            let payload = format!("{}\n{}\n{}\n", LINE, LINE, LINE);
            let bytes = payload.as_bytes();

            let mut whole = LineReassembler::default();
            let expected = records(whole.push(bytes));

            let mut fragmented = LineReassembler::default();
            let mut got = Vec::new();
            let mut offset = 0;
            for size in chunk_sizes {
                if offset >= bytes.len() {
                    break;
                }
                let end = (offset + size).min(bytes.len());
                got.extend(records(fragmented.push(&bytes[offset..end])));
                offset = end;
            }
            got.extend(records(fragmented.push(&bytes[offset..])));

            proptest::prop_assert_eq!(got, expected);
        }
    }
}
