//! Recording Sessions
//!
//! Drains the shared buffer into durable CSV files through a dedicated
//! worker with its own cursor, so a slow disk never touches the live
//! pipeline. Each session produces the data file plus a JSON sidecar with
//! the session summary.

mod manager;
mod worker;
mod writer;

pub use manager::{RecorderManager, RecordingStatus, SessionState, StartMode};
pub use worker::RecordingWorker;
pub use writer::{list_sessions, RecordFileWriter, SessionInfo, SessionSink};

use thiserror::Error;

/// Recorder errors
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Storage I/O failure
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Sidecar metadata could not be written or read
    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Start requested while a session is active
    #[error("Recording already in progress")]
    AlreadyRecording,

    /// Stop requested with no active session
    #[error("No recording in progress")]
    NotRecording,

    /// The worker did not drain and flush within the shutdown timeout
    #[error("Recording worker did not stop within {timeout_ms}ms")]
    ShutdownTimeout { timeout_ms: u64 },

    /// The worker task panicked
    #[error("Recording worker failed: {0}")]
    WorkerFailed(String),
}

/// Recorder tuning
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Directory for session files (date subdirectories are created inside)
    pub output_dir: std::path::PathBuf,
    /// Flush to the file after this many buffered rows
    pub flush_rows: usize,
    /// Flush at least this often regardless of row count
    pub flush_interval: std::time::Duration,
    /// Worker poll interval against the shared buffer
    pub poll_interval: std::time::Duration,
    /// Bound on the final drain-and-flush during stop
    pub shutdown_timeout: std::time::Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: std::path::PathBuf::from("recordings"),
            flush_rows: 100,
            flush_interval: std::time::Duration::from_secs(4),
            poll_interval: std::time::Duration::from_millis(20),
            shutdown_timeout: std::time::Duration::from_secs(5),
        }
    }
}
