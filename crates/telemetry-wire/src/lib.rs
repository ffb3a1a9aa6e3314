//! Telemetry Wire Format
//!
//! Provides the sensor record data model, the CSV line codec used on both
//! the wireless and wired channels, and fragment reassembly for deliveries
//! that split records at arbitrary byte boundaries.

mod epoch;
mod error;
mod reassembler;
mod record;

pub use epoch::EpochClock;
pub use error::WireError;
pub use reassembler::{LineReassembler, ReassemblerConfig, ReassemblerEvent};
pub use record::SensorRecord;

/// Line terminator byte for the wire format
pub const RECORD_TERMINATOR: u8 = b'\n';

/// Number of comma-separated fields in one wire record
pub const RECORD_FIELDS: usize = 9;

/// Audio RMS sentinel meaning "insufficient samples for this tick"
pub const AUDIO_RMS_MISSING: f32 = -1.0;
