//! Gravity cancellation.

use crate::types::{Orientation, Vec3};

/// Subtracts the orientation-implied gravity vector from measured acceleration.
#[derive(Debug, Clone, Copy)]
pub struct GravityCanceller {
    standard_gravity: f64,
}

impl GravityCanceller {
    pub const fn new(standard_gravity: f64) -> Self {
        Self { standard_gravity }
    }

    /// Gravity as seen in the sensor frame for the given attitude.
    pub fn gravity_vector(&self, orientation: &Orientation) -> Vec3 {
        let (sr, cr) = orientation.roll.sin_cos();
        let (sp, cp) = orientation.pitch.sin_cos();
        Vec3::new(-sp, sr * cp, cr * cp) * self.standard_gravity
    }

    /// Linear (motion-only) acceleration.
    pub fn cancel(&self, orientation: &Orientation, accel_ms2: &Vec3) -> Vec3 {
        accel_ms2 - self.gravity_vector(orientation)
    }
}
