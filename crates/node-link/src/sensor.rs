//! IMU Sensor Access

use crate::error::SensorError;
use tracing::{debug, info};

/// One motion/temperature reading from the IMU
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuSample {
    /// 3-axis acceleration (g)
    pub accel: [f32; 3],
    /// 3-axis angular rate (degrees/second)
    pub gyro: [f32; 3],
    /// Die temperature (°C)
    pub temp_c: f32,
}

/// A live, initialized IMU
pub trait ImuSensor {
    /// Read one complete sample
    fn read_sample(&mut self) -> Result<ImuSample, SensorError>;
}

/// The bus the IMU sits on.
///
/// Initialization can fail at boot (sensor absent, wrong address); the node
/// retries through this trait and runs a diagnostic scan while the sensor
/// is missing.
pub trait ImuBus {
    /// Try to bring up the sensor, returning a live handle on success
    fn probe(&mut self) -> Option<Box<dyn ImuSensor>>;

    /// Diagnostic scan: addresses of devices responding on the bus
    fn scan(&mut self) -> Vec<u8>;
}

/// Deterministic sinusoidal IMU for tests and hardware-free runs
pub struct MockImu {
    tick: u64,
}

impl MockImu {
    /// Create a mock starting at phase zero
    pub fn new() -> Self {
        Self { tick: 0 }
    }
}

impl Default for MockImu {
    fn default() -> Self {
        Self::new()
    }
}

impl ImuSensor for MockImu {
    fn read_sample(&mut self) -> Result<ImuSample, SensorError> {
        let t = self.tick as f32 * 0.01;
        self.tick += 1;
        debug!(tick = self.tick, "mock IMU sample");
        Ok(ImuSample {
            accel: [
                0.5 * (t * 0.5).sin(),
                0.3 * (t * 0.3).cos(),
                1.0 + 0.2 * (t * 0.1).sin(),
            ],
            gyro: [10.0 * (t * 0.8).sin(), 15.0 * (t * 0.6).cos(), 5.0 * (t * 0.4).sin()],
            temp_c: 25.0 + 3.0 * (t * 0.01).sin(),
        })
    }
}

/// Mock bus that starts reporting the sensor present after a configurable
/// number of probe attempts
pub struct MockImuBus {
    probes_until_present: u32,
    probes: u32,
}

impl MockImuBus {
    /// Sensor answers on the first probe
    pub fn present() -> Self {
        Self {
            probes_until_present: 0,
            probes: 0,
        }
    }

    /// Sensor appears only after `n` failed probes
    pub fn absent_for(n: u32) -> Self {
        Self {
            probes_until_present: n,
            probes: 0,
        }
    }

    /// Probe attempts made so far
    pub fn probe_count(&self) -> u32 {
        self.probes
    }
}

impl ImuBus for MockImuBus {
    fn probe(&mut self) -> Option<Box<dyn ImuSensor>> {
        self.probes += 1;
        if self.probes > self.probes_until_present {
            info!(attempts = self.probes, "mock IMU online");
            Some(Box::new(MockImu::new()))
        } else {
            None
        }
    }

    fn scan(&mut self) -> Vec<u8> {
        if self.probes >= self.probes_until_present {
            vec![0x6a]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_imu_is_deterministic() {
        let mut a = MockImu::new();
        let mut b = MockImu::new();
        for _ in 0..10 {
            assert_eq!(a.read_sample().unwrap(), b.read_sample().unwrap());
        }
    }

    #[test]
    fn test_mock_bus_appears_after_retries() {
        let mut bus = MockImuBus::absent_for(3);
        assert!(bus.probe().is_none());
        assert!(bus.probe().is_none());
        assert!(bus.probe().is_none());
        assert!(bus.probe().is_some());
    }
}
