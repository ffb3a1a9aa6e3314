//! Recording Session Manager

use crate::worker::RecordingWorker;
use crate::writer::{RecordFileWriter, SessionInfo, SessionSink};
use crate::{RecorderConfig, RecorderError};
use chrono::{DateTime, Utc};
use shared_buffer::SharedBuffer;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session active
    Idle,
    /// Worker draining the buffer
    Recording,
    /// Final drain-and-flush in progress
    Stopping,
    /// The last session died on a storage failure
    Error,
}

/// Where the session's cursor starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Record from now: cursor starts at the current write index
    Live,
    /// Also capture whatever the buffer still retains
    FullHistory,
}

/// Snapshot of the recorder for status queries
#[derive(Debug, Clone)]
pub struct RecordingStatus {
    pub state: SessionState,
    pub session_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub samples_recorded: u64,
    pub file_path: Option<PathBuf>,
}

struct ActiveSession {
    session_id: String,
    start_time: DateTime<Utc>,
    file_path: PathBuf,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<Result<SessionInfo, RecorderError>>,
    samples: Arc<AtomicU64>,
}

struct ManagerInner {
    state: SessionState,
    session: Option<ActiveSession>,
}

/// Coordinates recording sessions against one shared buffer.
///
/// Start opens the file and spawns the worker; stop requests a final drain
/// bounded by the shutdown timeout. A storage failure lands the manager in
/// `Error` until the next start, without disturbing the live pipeline.
pub struct RecorderManager {
    buffer: Arc<SharedBuffer>,
    config: RecorderConfig,
    inner: Mutex<ManagerInner>,
}

impl RecorderManager {
    /// Create a manager writing sessions under `config.output_dir`
    pub fn new(buffer: Arc<SharedBuffer>, config: RecorderConfig) -> Self {
        Self {
            buffer,
            config,
            inner: Mutex::new(ManagerInner {
                state: SessionState::Idle,
                session: None,
            }),
        }
    }

    /// Start a session
    pub async fn start(&self, mode: StartMode) -> Result<RecordingStatus, RecorderError> {
        let mut inner = self.inner.lock().await;
        if inner.session.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }

        let start_time = Utc::now();
        let session_id = format!(
            "{}_{}",
            start_time.format("%Y%m%d_%H%M%S"),
            &Uuid::new_v4().to_string()[..8]
        );
        let file_path = self
            .config
            .output_dir
            .join(start_time.format("%Y-%m-%d").to_string())
            .join(format!("sensor_data_{}.csv", session_id));

        let writer = RecordFileWriter::create(&file_path, &session_id)?;
        self.register(
            &mut inner,
            Box::new(writer),
            session_id,
            start_time,
            file_path,
            mode,
        );
        drop(inner);

        Ok(self.status().await)
    }

    /// Spawn the worker for an opened sink and record the active session
    fn register(
        &self,
        inner: &mut ManagerInner,
        sink: Box<dyn SessionSink>,
        session_id: String,
        start_time: DateTime<Utc>,
        file_path: PathBuf,
        mode: StartMode,
    ) {
        let cursor = match mode {
            StartMode::Live => self.buffer.write_index(),
            StartMode::FullHistory => self.buffer.base_index(),
        };

        let samples = Arc::new(AtomicU64::new(0));
        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = RecordingWorker::new(
            Arc::clone(&self.buffer),
            sink,
            self.config.clone(),
            cursor,
            Arc::clone(&samples),
        );
        let handle = tokio::spawn(worker.run(stop_rx));

        info!(session = %session_id, ?mode, cursor, "recording started");
        inner.state = SessionState::Recording;
        inner.session = Some(ActiveSession {
            session_id,
            start_time,
            file_path,
            stop_tx,
            handle,
            samples,
        });
    }

    /// Stop the active session, waiting for the final drain and flush
    pub async fn stop(&self) -> Result<SessionInfo, RecorderError> {
        let mut inner = self.inner.lock().await;
        let session = inner.session.take().ok_or(RecorderError::NotRecording)?;
        inner.state = SessionState::Stopping;
        drop(inner);

        let _ = session.stop_tx.send(true);
        let timeout = self.config.shutdown_timeout;
        let outcome = tokio::time::timeout(timeout, session.handle).await;

        let mut inner = self.inner.lock().await;
        match outcome {
            Ok(Ok(Ok(info))) => {
                inner.state = SessionState::Idle;
                info!(session = %info.session_id, samples = info.total_samples, "recording stopped");
                Ok(info)
            }
            Ok(Ok(Err(e))) => {
                inner.state = SessionState::Error;
                error!(error = %e, "session ended in error");
                Err(e)
            }
            Ok(Err(join_err)) => {
                inner.state = SessionState::Error;
                Err(RecorderError::WorkerFailed(join_err.to_string()))
            }
            Err(_) => {
                inner.state = SessionState::Error;
                warn!("worker missed shutdown deadline");
                Err(RecorderError::ShutdownTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Current recorder state and session progress.
    ///
    /// A worker task that ended on its own died on a storage failure (a
    /// clean end only happens through `stop`), so the session is reported
    /// as `Error` rather than left looking live.
    pub async fn status(&self) -> RecordingStatus {
        let mut inner = self.inner.lock().await;
        let worker_died = inner.state == SessionState::Recording
            && inner
                .session
                .as_ref()
                .map_or(false, |s| s.handle.is_finished());
        if worker_died {
            if let Some(s) = &inner.session {
                warn!(session = %s.session_id, "recording worker ended early");
            }
            inner.state = SessionState::Error;
        }
        match &inner.session {
            Some(s) => RecordingStatus {
                state: inner.state,
                session_id: Some(s.session_id.clone()),
                start_time: Some(s.start_time),
                samples_recorded: s.samples.load(Ordering::Relaxed),
                file_path: Some(s.file_path.clone()),
            },
            None => RecordingStatus {
                state: inner.state,
                session_id: None,
                start_time: None,
                samples_recorded: 0,
                file_path: None,
            },
        }
    }

    /// Summaries of past sessions, newest first
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        crate::writer::list_sessions(&self.config.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_wire::SensorRecord;

    fn record(n: u32) -> SensorRecord {
        SensorRecord {
            timestamp_ms: n,
            accel: [0.0, 0.0, 1.0],
            gyro: [0.0, 0.0, 0.0],
            temp_c: 24.0,
            audio_rms: 50.0,
        }
    }

    fn manager(dir: &std::path::Path, buffer: Arc<SharedBuffer>) -> RecorderManager {
        RecorderManager::new(
            buffer,
            RecorderConfig {
                output_dir: dir.to_path_buf(),
                ..RecorderConfig::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(SharedBuffer::with_default_capacity());
        let mgr = manager(dir.path(), Arc::clone(&buffer));

        assert_eq!(mgr.status().await.state, SessionState::Idle);

        let status = mgr.start(StartMode::Live).await.unwrap();
        assert_eq!(status.state, SessionState::Recording);

        for n in 0..50 {
            buffer.append(record(n));
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let info = mgr.stop().await.unwrap();
        assert_eq!(info.total_samples, 50);
        assert_eq!(mgr.status().await.state, SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(SharedBuffer::with_default_capacity());
        let mgr = manager(dir.path(), buffer);

        mgr.start(StartMode::Live).await.unwrap();
        assert!(matches!(
            mgr.start(StartMode::Live).await,
            Err(RecorderError::AlreadyRecording)
        ));
        mgr.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_without_start_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(SharedBuffer::with_default_capacity());
        let mgr = manager(dir.path(), buffer);
        assert!(matches!(mgr.stop().await, Err(RecorderError::NotRecording)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_history_captures_retained_records() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(SharedBuffer::with_default_capacity());
        for n in 0..30 {
            buffer.append(record(n));
        }
        let mgr = manager(dir.path(), Arc::clone(&buffer));

        mgr.start(StartMode::FullHistory).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let info = mgr.stop().await.unwrap();
        assert_eq!(info.total_samples, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_mode_skips_history() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(SharedBuffer::with_default_capacity());
        for n in 0..30 {
            buffer.append(record(n));
        }
        let mgr = manager(dir.path(), Arc::clone(&buffer));

        mgr.start(StartMode::Live).await.unwrap();
        buffer.append(record(99));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let info = mgr.stop().await.unwrap();
        assert_eq!(info.total_samples, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_sessions_after_two_runs() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(SharedBuffer::with_default_capacity());
        let mgr = manager(dir.path(), Arc::clone(&buffer));

        for _ in 0..2 {
            mgr.start(StartMode::Live).await.unwrap();
            buffer.append(record(1));
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            mgr.stop().await.unwrap();
        }
        assert_eq!(mgr.list_sessions().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failure_surfaces_error_state() {
        let dir = tempfile::tempdir().unwrap();
        let buffer = Arc::new(SharedBuffer::with_default_capacity());
        let mgr = manager(dir.path(), Arc::clone(&buffer));
        // Backlog large enough that the first drain crosses the flush
        // threshold and hits the sink failure
        for n in 0..120 {
            buffer.append(record(n));
        }

        {
            let mut inner = mgr.inner.lock().await;
            mgr.register(
                &mut inner,
                Box::new(crate::worker::FailingSink::new()),
                "failing".to_string(),
                Utc::now(),
                dir.path().join("failing.csv"),
                StartMode::FullHistory,
            );
        }

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        // The dead worker is reported, not a phantom live session
        let status = mgr.status().await;
        assert_eq!(status.state, SessionState::Error);

        // The live pipeline never noticed
        buffer.append(record(999));
        assert_eq!(buffer.write_index(), 121);

        // Stop reaps the worker's storage error and stays in Error
        assert!(matches!(mgr.stop().await, Err(RecorderError::Io(_))));
        assert_eq!(mgr.status().await.state, SessionState::Error);
    }
}
