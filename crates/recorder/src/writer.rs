//! Buffered CSV File Writer

use crate::RecorderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use telemetry_wire::SensorRecord;
use tracing::{info, warn};

/// CSV header matching the wire schema
const CSV_HEADER: &str = "timestamp_ms,ax,ay,az,gx,gy,gz,temp_c,audio_rms";

/// Summary of one finished recording session, also persisted as the
/// `.meta.json` sidecar next to the data file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub total_samples: u64,
    pub average_rate_hz: f64,
    pub file_path: PathBuf,
    pub file_size_bytes: u64,
}

/// Synchronous CSV writer with internal row buffering.
///
/// Rows accumulate in memory and hit the file only on flush, keeping the
/// worker's buffer-drain passes cheap.
pub struct RecordFileWriter {
    path: PathBuf,
    session_id: String,
    file: File,
    pending: Vec<String>,
    sample_count: u64,
    start_time: DateTime<Utc>,
}

impl RecordFileWriter {
    /// Create the data file and write the comment preamble and header
    pub fn create(path: &Path, session_id: &str) -> Result<Self, RecorderError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let start_time = Utc::now();
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        writeln!(file, "# session: {}", session_id)?;
        writeln!(file, "# started: {}", start_time.to_rfc3339())?;
        writeln!(file, "{}", CSV_HEADER)?;
        file.flush()?;
        info!(path = %path.display(), "recording file opened");

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            file,
            pending: Vec::new(),
            sample_count: 0,
            start_time,
        })
    }

    /// Buffer rows; the caller decides when thresholds force a flush
    pub fn append_rows(&mut self, records: &[SensorRecord]) {
        for record in records {
            self.pending.push(record.to_csv_line());
            self.sample_count += 1;
        }
    }

    /// Rows buffered but not yet on disk
    pub fn pending_rows(&self) -> usize {
        self.pending.len()
    }

    /// Total rows accepted this session
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Write buffered rows to the file
    pub fn flush(&mut self, force_sync: bool) -> Result<(), RecorderError> {
        if !self.pending.is_empty() {
            let mut chunk = String::new();
            for line in self.pending.drain(..) {
                chunk.push_str(&line);
                chunk.push('\n');
            }
            self.file.write_all(chunk.as_bytes())?;
            self.file.flush()?;
        }
        if force_sync {
            // The final flush is the durable one; a failed fsync is a
            // failed session, not a warning
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Flush everything, write the sidecar metadata, and close.
    ///
    /// `duration` comes from the worker's own clock so the summary stays
    /// meaningful under simulated time in tests.
    pub fn close(mut self, duration: Duration) -> Result<SessionInfo, RecorderError> {
        self.flush(true)?;

        let end_time = Utc::now();
        let duration_seconds = duration.as_secs_f64();
        let file_size_bytes = std::fs::metadata(&self.path)?.len();
        let average_rate_hz = if duration_seconds > 0.0 {
            self.sample_count as f64 / duration_seconds
        } else {
            0.0
        };

        let info = SessionInfo {
            session_id: self.session_id.clone(),
            start_time: self.start_time,
            end_time,
            duration_seconds,
            total_samples: self.sample_count,
            average_rate_hz,
            file_path: self.path.clone(),
            file_size_bytes,
        };

        let meta_path = self.path.with_extension("meta.json");
        let meta_file = File::create(&meta_path)?;
        serde_json::to_writer_pretty(meta_file, &info)?;

        info!(
            samples = info.total_samples,
            seconds = info.duration_seconds,
            bytes = info.file_size_bytes,
            "recording closed"
        );
        Ok(info)
    }
}

/// Destination for one session's rows.
///
/// `RecordFileWriter` is the production implementation; tests substitute
/// sinks that fail on demand to exercise the storage error path.
pub trait SessionSink: Send {
    /// Buffer rows for the next flush
    fn append_rows(&mut self, records: &[SensorRecord]);

    /// Rows buffered but not yet written out
    fn pending_rows(&self) -> usize;

    /// Total rows accepted this session
    fn sample_count(&self) -> u64;

    /// Write buffered rows out, durably when `force_sync` is set
    fn flush(&mut self, force_sync: bool) -> Result<(), RecorderError>;

    /// Flush everything, finalize, and produce the session summary
    fn close(self: Box<Self>, duration: Duration) -> Result<SessionInfo, RecorderError>;
}

impl SessionSink for RecordFileWriter {
    fn append_rows(&mut self, records: &[SensorRecord]) {
        RecordFileWriter::append_rows(self, records);
    }

    fn pending_rows(&self) -> usize {
        RecordFileWriter::pending_rows(self)
    }

    fn sample_count(&self) -> u64 {
        RecordFileWriter::sample_count(self)
    }

    fn flush(&mut self, force_sync: bool) -> Result<(), RecorderError> {
        RecordFileWriter::flush(self, force_sync)
    }

    fn close(self: Box<Self>, duration: Duration) -> Result<SessionInfo, RecorderError> {
        RecordFileWriter::close(*self, duration)
    }
}

/// Load session summaries from sidecar files under `dir`, newest first
pub fn list_sessions(dir: &Path) -> Vec<SessionInfo> {
    let mut sessions = Vec::new();
    collect_sidecars(dir, &mut sessions);
    sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
    sessions
}

fn collect_sidecars(dir: &Path, out: &mut Vec<SessionInfo>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_sidecars(&path, out);
        } else if path.file_name().map_or(false, |n| {
            n.to_string_lossy().ends_with(".meta.json")
        }) {
            match File::open(&path).map_err(RecorderError::from).and_then(|f| {
                serde_json::from_reader::<_, SessionInfo>(f).map_err(RecorderError::from)
            }) {
                Ok(info) => out.push(info),
                Err(e) => warn!(path = %path.display(), error = %e, "unreadable sidecar"),
            }
        }
    }
}
