//! Online single-component PCA projection.
//!
//! Keeps a running mean and 3x3 co-moment (Welford), re-solves the
//! symmetric eigenproblem each sample and projects the mean-centred input
//! onto the dominant eigenvector. State is O(1) regardless of session
//! length.

use nalgebra::{Matrix3, SymmetricEigen};

use crate::types::Vec3;

/// Eigenvalues at or below this are treated as "no variation yet".
const MIN_VARIANCE: f64 = 1e-15;

#[derive(Debug, Clone)]
pub struct IncrementalProjector {
    count: u64,
    mean: Vec3,
    comoment: Matrix3<f64>,
    /// Unit length at all times.
    direction: Vec3,
}

impl Default for IncrementalProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalProjector {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: Vec3::zeros(),
            comoment: Matrix3::zeros(),
            direction: Vec3::x(),
        }
    }

    /// Absorb `v` and return its signed projection on the dominant axis.
    ///
    /// The first call returns `0.0`. The sign of the output is arbitrary;
    /// only magnitude and periodicity carry information.
    pub fn observe(&mut self, v: &Vec3) -> f64 {
        self.count += 1;
        let n = self.count as f64;

        let delta = v - self.mean;
        self.mean += delta / n;
        // Equal to (v - mean_old)(v - mean_new)^T, but exactly symmetric
        self.comoment += delta * delta.transpose() * ((n - 1.0) / n);

        if self.count == 1 {
            return 0.0;
        }

        self.update_direction();
        (v - self.mean).dot(&self.direction)
    }

    fn update_direction(&mut self) {
        let covariance = self.comoment / (self.count as f64 - 1.0);
        let eigen = SymmetricEigen::new(covariance);

        let i = eigen.eigenvalues.imax();
        let largest = eigen.eigenvalues[i];
        if !largest.is_finite() || largest <= MIN_VARIANCE {
            return;
        }

        let mut candidate: Vec3 = eigen.eigenvectors.column(i).into_owned();
        let norm = candidate.norm();
        if !norm.is_finite() || norm == 0.0 {
            return;
        }
        candidate /= norm;

        // Keep the orientation continuous with the previous estimate
        if candidate.dot(&self.direction) < 0.0 {
            candidate = -candidate;
        }
        self.direction = candidate;
    }

    /// Current unit projection direction.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn mean(&self) -> Vec3 {
        self.mean
    }

    /// Number of vectors absorbed so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}
