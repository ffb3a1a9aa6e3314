//! Node-Side Error Types

use thiserror::Error;

/// Errors from the IMU sensor path
#[derive(Debug, Error)]
pub enum SensorError {
    /// Sensor did not acknowledge on the bus
    #[error("IMU not responding at address {addr:#04x}")]
    NotResponding { addr: u8 },

    /// Bus-level failure during a read
    #[error("Bus error: {0}")]
    Bus(String),

    /// No sensor has been initialized yet
    #[error("IMU not initialized")]
    NotInitialized,
}
