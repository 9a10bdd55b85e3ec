//! Sensor sample types

use serde::{Deserialize, Serialize};

/// Three-component vector used for all per-sample vector math.
pub type Vec3 = nalgebra::Vector3<f64>;

/// Conversion from degrees to radians.
const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Triaxial reading exactly as the sensor reports it (raw LSB counts).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Axes {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Axes {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// One decoded input line.
///
/// `gyro` is `None` for the legacy accelerometer-only line shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Device timestamp (milliseconds)
    pub timestamp_ms: i64,
    /// Accelerometer (LSB)
    pub accel: Axes,
    /// Gyroscope (LSB)
    pub gyro: Option<Axes>,
}

/// Sensitivity constants used to convert raw counts into SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorScale {
    /// Accelerometer sensitivity (LSB per g)
    pub accel_lsb_per_g: f64,
    /// Gyroscope sensitivity (LSB per °/s)
    pub gyro_lsb_per_dps: f64,
    /// Standard gravity (m/s² per g)
    pub standard_gravity: f64,
}

impl Default for SensorScale {
    fn default() -> Self {
        Self {
            accel_lsb_per_g: crate::config::defaults::ACCEL_LSB_PER_G,
            gyro_lsb_per_dps: crate::config::defaults::GYRO_LSB_PER_DPS,
            standard_gravity: crate::config::defaults::STANDARD_GRAVITY,
        }
    }
}

impl SensorScale {
    /// Acceleration in m/s² for a raw accelerometer count.
    pub fn accel_to_ms2(&self, raw: f64) -> f64 {
        raw / self.accel_lsb_per_g * self.standard_gravity
    }

    /// Raw accelerometer count for an acceleration in m/s² (used by the simulator).
    pub fn ms2_to_accel(&self, ms2: f64) -> f64 {
        ms2 / self.standard_gravity * self.accel_lsb_per_g
    }

    /// Angular rate in rad/s for a raw gyroscope count.
    pub fn gyro_to_rad_s(&self, raw: f64) -> f64 {
        raw / self.gyro_lsb_per_dps * DEG_TO_RAD
    }

    /// Raw gyroscope count for an angular rate in rad/s (used by the simulator).
    pub fn rad_s_to_gyro(&self, rad_s: f64) -> f64 {
        rad_s / DEG_TO_RAD * self.gyro_lsb_per_dps
    }
}

/// A sample converted to SI units. Pure function of [`RawSample`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalSample {
    /// Acceleration (m/s²)
    pub accel_ms2: Vec3,
    /// Angular rate (rad/s); zero when the line carried no gyro
    pub gyro_rad_s: Vec3,
}

impl PhysicalSample {
    pub fn from_raw(raw: &RawSample, scale: &SensorScale) -> Self {
        let accel_ms2 = Vec3::new(
            scale.accel_to_ms2(raw.accel.x),
            scale.accel_to_ms2(raw.accel.y),
            scale.accel_to_ms2(raw.accel.z),
        );
        let gyro_rad_s = raw.gyro.map_or_else(Vec3::zeros, |g| {
            Vec3::new(
                scale.gyro_to_rad_s(g.x),
                scale.gyro_to_rad_s(g.y),
                scale.gyro_to_rad_s(g.z),
            )
        });
        Self {
            accel_ms2,
            gyro_rad_s,
        }
    }
}

/// Roll/pitch attitude estimate (radians).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub roll: f64,
    pub pitch: f64,
}

impl Orientation {
    pub const fn new(roll: f64, pitch: f64) -> Self {
        Self { roll, pitch }
    }
}
