//! Runtime Settings

use serde::Deserialize;

fn default_buffer_capacity() -> usize {
    shared_buffer::DEFAULT_CAPACITY
}

fn default_viz_hz() -> f64 {
    15.0
}

fn default_mock_rate_hz() -> f64 {
    25.0
}

fn default_output_dir() -> String {
    "recordings".to_string()
}

/// Host process settings, overridable through `TELEMETRY_*` environment
/// variables (e.g. `TELEMETRY_BUFFER_CAPACITY=5000`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Shared buffer capacity in records
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Visualization poll rate (Hz)
    #[serde(default = "default_viz_hz")]
    pub viz_hz: f64,

    /// Mock source emission rate (Hz)
    #[serde(default = "default_mock_rate_hz")]
    pub mock_rate_hz: f64,

    /// Directory for recording sessions
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            viz_hz: default_viz_hz(),
            mock_rate_hz: default_mock_rate_hz(),
            output_dir: default_output_dir(),
        }
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("TELEMETRY"))
            .build()?
            .try_deserialize()
    }
}
