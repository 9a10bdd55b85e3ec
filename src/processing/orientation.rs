//! Complementary-filter roll/pitch tracker.

use crate::types::{Orientation, Vec3};

/// Fuses integrated gyro rate with accelerometer tilt.
///
/// The gyro path is responsive but drifts; the accelerometer path is noisy
/// but drift-free. `alpha` is the weight given to the gyro path.
///
/// `dt_s` is the nominal sample period supplied by the caller, not the
/// measured inter-sample time. Irregular input timing biases the estimate.
#[derive(Debug, Clone)]
pub struct OrientationTracker {
    alpha: f64,
    orientation: Orientation,
}

impl OrientationTracker {
    pub fn new(alpha: f64) -> Self {
        Self::with_initial(alpha, Orientation::default())
    }

    pub fn with_initial(alpha: f64, initial: Orientation) -> Self {
        Self {
            alpha,
            orientation: initial,
        }
    }

    /// Advance the estimate by one sample and return the new orientation.
    pub fn update(&mut self, gyro_rad_s: &Vec3, accel_ms2: &Vec3, dt_s: f64) -> Orientation {
        let roll_gyro = self.orientation.roll + gyro_rad_s.x * dt_s;
        let pitch_gyro = self.orientation.pitch + gyro_rad_s.y * dt_s;

        let acc_roll = accel_ms2.y.atan2(accel_ms2.z);
        let acc_pitch = (-accel_ms2.x).atan2(accel_ms2.y.hypot(accel_ms2.z));

        self.orientation = Orientation {
            roll: self.alpha * roll_gyro + (1.0 - self.alpha) * acc_roll,
            pitch: self.alpha * pitch_gyro + (1.0 - self.alpha) * acc_pitch,
        };
        self.orientation
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::{COMPLEMENTARY_ALPHA, NOMINAL_DT_S, STANDARD_GRAVITY};

    #[test]
    fn test_level_sensor_converges_to_zero_from_any_start() {
        let level = Vec3::new(0.0, 0.0, STANDARD_GRAVITY);
        for (roll, pitch) in [(1.0, -0.5), (-2.5, 1.2), (0.0, 0.0), (3.0, 3.0)] {
            let mut t = OrientationTracker::with_initial(
                COMPLEMENTARY_ALPHA,
                Orientation::new(roll, pitch),
            );
            let mut prev = f64::INFINITY;
            for _ in 0..1000 {
                let o = t.update(&Vec3::zeros(), &level, NOMINAL_DT_S);
                let mag = o.roll.abs() + o.pitch.abs();
                assert!(mag <= prev + 1e-15, "error must not grow");
                prev = mag;
            }
            let o = t.orientation();
            assert!(o.roll.abs() < 1e-6, "roll = {}", o.roll);
            assert!(o.pitch.abs() < 1e-6, "pitch = {}", o.pitch);
        }
    }

    #[test]
    fn test_accelerometer_tilt_is_recovered() {
        // Static sensor rolled by 0.3 rad
        let roll: f64 = 0.3;
        let accel = Vec3::new(
            0.0,
            STANDARD_GRAVITY * roll.sin(),
            STANDARD_GRAVITY * roll.cos(),
        );
        let mut t = OrientationTracker::new(COMPLEMENTARY_ALPHA);
        for _ in 0..1000 {
            t.update(&Vec3::zeros(), &accel, NOMINAL_DT_S);
        }
        assert!((t.orientation().roll - roll).abs() < 1e-6);
        assert!(t.orientation().pitch.abs() < 1e-6);
    }

    #[test]
    fn test_single_step_blends_gyro_and_tilt() {
        let mut t = OrientationTracker::new(0.98);
        let level = Vec3::new(0.0, 0.0, STANDARD_GRAVITY);
        let o = t.update(&Vec3::new(1.0, -2.0, 0.0), &level, 0.05);
        assert!((o.roll - 0.98 * 0.05).abs() < 1e-12);
        assert!((o.pitch + 0.98 * 0.1).abs() < 1e-12);
    }
}
