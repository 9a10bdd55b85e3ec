//! Line decoder for the sensor bridge protocol.
//!
//! Two line shapes exist and the caller picks one via [`InputFormat`]; the
//! decoder never probes:
//!
//! ```text
//! imu:          {"timestamp": 1234, "sensor3": {"accel": {"x":..,"y":..,"z":..},
//!                                               "gyro":  {"x":..,"y":..,"z":..}}}
//! legacy_accel: {"timestamp": 1234, "sensor3": {"x":..,"y":..,"z":..}}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::InputFormat;
use crate::types::{Axes, RawSample};

/// Decode failures. The line is dropped and no pipeline state changes.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("empty line")]
    Empty,

    #[error("malformed sample line: {0}")]
    Json(#[from] serde_json::Error),

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

#[derive(Debug, Serialize, Deserialize)]
struct ImuLine {
    timestamp: i64,
    sensor3: ImuBlock,
}

#[derive(Debug, Serialize, Deserialize)]
struct ImuBlock {
    accel: Axes,
    gyro: Axes,
}

#[derive(Debug, Serialize, Deserialize)]
struct LegacyLine {
    timestamp: i64,
    sensor3: Axes,
}

/// Decode one input line in the configured shape.
pub fn decode_line(line: &str, format: InputFormat) -> Result<RawSample, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DecodeError::Empty);
    }

    let sample = match format {
        InputFormat::Imu => {
            let parsed: ImuLine = serde_json::from_str(line)?;
            RawSample {
                timestamp_ms: parsed.timestamp,
                accel: parsed.sensor3.accel,
                gyro: Some(parsed.sensor3.gyro),
            }
        }
        InputFormat::LegacyAccel => {
            let parsed: LegacyLine = serde_json::from_str(line)?;
            RawSample {
                timestamp_ms: parsed.timestamp,
                accel: parsed.sensor3,
                gyro: None,
            }
        }
    };

    if !sample.accel.is_finite() {
        return Err(DecodeError::NonFinite("accel"));
    }
    if sample.gyro.is_some_and(|g| !g.is_finite()) {
        return Err(DecodeError::NonFinite("gyro"));
    }

    Ok(sample)
}

/// Render a sample as one line in the given shape (no trailing newline).
///
/// A sample without gyro encodes zero rates in the imu shape; the legacy
/// shape drops the gyro entirely.
pub fn encode_line(sample: &RawSample, format: InputFormat) -> Result<String, serde_json::Error> {
    match format {
        InputFormat::Imu => serde_json::to_string(&ImuLine {
            timestamp: sample.timestamp_ms,
            sensor3: ImuBlock {
                accel: sample.accel,
                gyro: sample.gyro.unwrap_or_default(),
            },
        }),
        InputFormat::LegacyAccel => serde_json::to_string(&LegacyLine {
            timestamp: sample.timestamp_ms,
            sensor3: sample.accel,
        }),
    }
}
