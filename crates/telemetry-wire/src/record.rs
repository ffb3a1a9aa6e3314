//! Sensor Record Data Model

use crate::error::WireError;
use crate::{AUDIO_RMS_MISSING, RECORD_FIELDS};
use serde::{Deserialize, Serialize};

/// One complete sensor reading from the node.
///
/// Created once per sample tick and never mutated afterwards. The field
/// order matches the wire schema:
/// `timestamp_ms,ax,ay,az,gx,gy,gz,temp_c,audio_rms`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Device-relative uptime in milliseconds, wraps at 2^32
    pub timestamp_ms: u32,
    /// 3-axis acceleration (g)
    pub accel: [f32; 3],
    /// 3-axis angular rate (degrees/second)
    pub gyro: [f32; 3],
    /// IMU temperature (°C)
    pub temp_c: f32,
    /// Audio RMS over the sample window, or -1.0 when insufficient samples
    pub audio_rms: f32,
}

impl SensorRecord {
    /// Check whether the audio field carries a measurement
    pub fn has_audio(&self) -> bool {
        self.audio_rms >= 0.0
    }

    /// Format as one wire-schema CSV line, without the terminator.
    ///
    /// Motion axes use three decimals, temperature and audio two, matching
    /// the node firmware's output precision.
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.2},{:.2}",
            self.timestamp_ms,
            self.accel[0],
            self.accel[1],
            self.accel[2],
            self.gyro[0],
            self.gyro[1],
            self.gyro[2],
            self.temp_c,
            self.audio_rms,
        )
    }

    /// Parse one wire-schema CSV line.
    ///
    /// Lenient with whitespace around commas (fragment reassembly can
    /// introduce stray spaces), strict on field count and numeric types.
    pub fn parse_csv(line: &str) -> Result<Self, WireError> {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() != RECORD_FIELDS {
            return Err(WireError::FieldCount {
                expected: RECORD_FIELDS,
                actual: parts.len(),
                line: line.to_string(),
            });
        }

        let timestamp_ms = parts[0]
            .parse::<u32>()
            .map_err(|_| WireError::InvalidField {
                field: "timestamp_ms",
                value: parts[0].to_string(),
            })?;

        let field_names: [&'static str; 8] = [
            "ax", "ay", "az", "gx", "gy", "gz", "temp_c", "audio_rms",
        ];
        let mut values = [0.0f32; 8];
        for (i, name) in field_names.iter().enumerate() {
            values[i] = parts[i + 1]
                .parse::<f32>()
                .map_err(|_| WireError::InvalidField {
                    field: name,
                    value: parts[i + 1].to_string(),
                })?;
        }

        Ok(Self {
            timestamp_ms,
            accel: [values[0], values[1], values[2]],
            gyro: [values[3], values[4], values[5]],
            temp_c: values[6],
            audio_rms: values[7],
        })
    }

    /// A record with the audio sentinel set and everything else from `self`
    pub fn without_audio(mut self) -> Self {
        self.audio_rms = AUDIO_RMS_MISSING;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SensorRecord {
        SensorRecord {
            timestamp_ms: 123456,
            accel: [0.012, -0.985, 0.143],
            gyro: [1.25, -0.5, 12.875],
            temp_c: 24.5,
            audio_rms: 312.25,
        }
    }

    #[test]
    fn test_format_matches_wire_schema() {
        let line = sample_record().to_csv_line();
        assert_eq!(line, "123456,0.012,-0.985,0.143,1.250,-0.500,12.875,24.50,312.25");
    }

    #[test]
    fn test_parse_round_trip() {
        let parsed = SensorRecord::parse_csv(&sample_record().to_csv_line()).unwrap();
        assert_eq!(parsed, sample_record());
    }

    #[test]
    fn test_parse_lenient_whitespace() {
        let parsed =
            SensorRecord::parse_csv("100, 0.1, 0.2, 0.3, 1.0, 2.0, 3.0, 25.0, -1.0").unwrap();
        assert_eq!(parsed.timestamp_ms, 100);
        assert!(!parsed.has_audio());
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        let err = SensorRecord::parse_csv("100,0.1,0.2").unwrap_err();
        assert!(matches!(err, WireError::FieldCount { actual: 3, .. }));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let err =
            SensorRecord::parse_csv("100,0.1,0.2,0.3,1.0,2.0,abc,25.0,-1.0").unwrap_err();
        assert!(matches!(err, WireError::InvalidField { field: "gz", .. }));
    }

    #[test]
    fn test_audio_sentinel() {
        let rec = sample_record().without_audio();
        assert_eq!(rec.audio_rms, AUDIO_RMS_MISSING);
        assert!(!rec.has_audio());
    }
}
