//! Node-Side Telemetry
//!
//! Implements the sensor node's cooperative main loop: IMU sampling, audio
//! RMS extraction, full-rate wired output, and the single-in-flight link
//! streamer that feeds the wireless notify channel. Everything is driven by
//! an explicit per-tick call so tests can run the node against a synthetic
//! clock.

mod clock;
mod error;
mod node;
mod sensor;
mod streamer;
mod transport;

pub use clock::{Clock, MonotonicClock, SimClock};
pub use error::SensorError;
pub use node::{NodeConfig, NodeStats, TelemetryNode};
pub use sensor::{ImuBus, ImuSample, ImuSensor, MockImu, MockImuBus};
pub use streamer::{LinkState, LinkStreamer, StreamerConfig, StreamerStats};
pub use transport::{LinkTransport, MemoryTransport, MemoryWiredSink, WiredSink};
