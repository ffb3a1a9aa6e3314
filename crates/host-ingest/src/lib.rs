//! Host-Side Pipeline
//!
//! Feeds transport deliveries through the reassembler into the shared
//! buffer and runs the consumers that fan the stream out: the
//! visualization poller and (via the recorder crate) durable recording.

mod ingest;
mod mock;
mod settings;
mod viz;

pub use ingest::{run_ingest, IngestStats};
pub use mock::{MockConfig, MockSource};
pub use settings::Settings;
pub use viz::{VisualizationPoller, VizConfig};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install the global log subscriber (idempotent)
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
