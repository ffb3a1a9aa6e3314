//! Telemetry Host
//!
//! Demo binary wiring the full host pipeline against the mock source:
//! mock node lines flow through the reassembler into the shared buffer,
//! the visualization poller reads at a fixed cadence, and a recording
//! session captures everything until Ctrl-C.

use anyhow::Context;
use host_ingest::{
    init_logging, run_ingest, MockConfig, MockSource, Settings, VisualizationPoller, VizConfig,
};
use recorder::{RecorderConfig, RecorderManager, StartMode};
use shared_buffer::SharedBuffer;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let settings = Settings::load().context("loading settings")?;
    info!(?settings, "telemetry host starting");

    let buffer = Arc::new(SharedBuffer::new(settings.buffer_capacity));

    let (tx, rx) = mpsc::channel(256);
    let source = MockSource::new(MockConfig {
        rate_hz: settings.mock_rate_hz,
        ..MockConfig::default()
    });
    tokio::spawn(source.run(tx));
    let ingest = tokio::spawn(run_ingest(rx, Arc::clone(&buffer)));

    let recorder = RecorderManager::new(
        Arc::clone(&buffer),
        RecorderConfig {
            output_dir: settings.output_dir.clone().into(),
            ..RecorderConfig::default()
        },
    );
    let status = recorder.start(StartMode::Live).await?;
    info!(session = ?status.session_id, "recording session open");

    let mut viz = VisualizationPoller::new(
        Arc::clone(&buffer),
        VizConfig {
            poll_hz: settings.viz_hz,
            ..VizConfig::default()
        },
    );
    let mut ticker = tokio::time::interval(viz.poll_interval());
    let mut report = tokio::time::interval(std::time::Duration::from_secs(5));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                viz.poll();
                if viz.gap_occurred() {
                    warn!("display fell behind the buffer");
                    viz.clear_gap();
                }
            }
            _ = report.tick() => {
                let stats = buffer.stats();
                let latest = viz.window().last().copied();
                info!(
                    fill = stats.fill_level,
                    total = stats.total_appended,
                    rate_hz = %format!("{:.1}", stats.sample_rate_hz),
                    audio = latest.map(|r| r.audio_rms),
                    "pipeline"
                );
            }
        }
    }

    info!("shutting down");
    let session = recorder.stop().await?;
    info!(
        file = %session.file_path.display(),
        samples = session.total_samples,
        rate_hz = %format!("{:.1}", session.average_rate_hz),
        "session closed"
    );

    // The mock source stops when ingest's receiver goes away with it
    ingest.abort();
    Ok(())
}
