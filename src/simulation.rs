//! Synthetic sensor stream for exercising the pipeline without hardware.
//!
//! Models a wearer at rest: gravity seen through a fixed tilt, plus a
//! sinusoidal chest-motion component on one sensor axis and optional
//! Gaussian noise. Output is in raw sensor counts, exactly what the
//! decoder produces from a real line.

use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::processing::GravityCanceller;
use crate::types::{Axes, Orientation, RawSample, SensorScale, Vec3};

/// Sensor axis carrying the breathing motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    #[default]
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::x(),
            Axis::Y => Vec3::y(),
            Axis::Z => Vec3::z(),
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("unknown axis '{other}' (expected x, y or z)")),
        }
    }
}

/// Builder-style generator of [`RawSample`]s. Also an [`Iterator`].
#[derive(Debug, Clone)]
pub struct SyntheticBreather {
    rng: StdRng,
    scale: SensorScale,
    sample_rate_hz: f64,
    breath_hz: f64,
    amplitude_ms2: f64,
    axis: Axis,
    tilt: Orientation,
    noise: Option<Normal<f64>>,
    start_timestamp_ms: i64,
    index: u64,
    limit: Option<u64>,
}

impl SyntheticBreather {
    /// 15 breaths/min, 0.2 m/s² on the y axis, level, noiseless.
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(0),
            scale: SensorScale::default(),
            sample_rate_hz,
            breath_hz: 0.25,
            amplitude_ms2: 0.2,
            axis: Axis::default(),
            tilt: Orientation::default(),
            noise: None,
            start_timestamp_ms: 0,
            index: 0,
            limit: None,
        }
    }

    pub fn breath_hz(mut self, hz: f64) -> Self {
        self.breath_hz = hz;
        self
    }

    pub fn breaths_per_minute(self, bpm: f64) -> Self {
        self.breath_hz(bpm / 60.0)
    }

    pub fn amplitude(mut self, ms2: f64) -> Self {
        self.amplitude_ms2 = ms2;
        self
    }

    pub fn axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    /// Static mounting tilt of the sensor.
    pub fn tilt(mut self, roll: f64, pitch: f64) -> Self {
        self.tilt = Orientation::new(roll, pitch);
        self
    }

    /// Per-axis Gaussian noise (m/s² standard deviation). Zero disables noise.
    pub fn noise(mut self, std_ms2: f64) -> Self {
        self.noise = if std_ms2 > 0.0 {
            Normal::new(0.0, std_ms2).ok()
        } else {
            None
        };
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Seed from OS entropy.
    pub fn unseeded(mut self) -> Self {
        self.rng = StdRng::from_entropy();
        self
    }

    pub fn scale(mut self, scale: SensorScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn start_timestamp_ms(mut self, ts: i64) -> Self {
        self.start_timestamp_ms = ts;
        self
    }

    /// Stop after `n` samples.
    pub fn take_samples(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Stop after `seconds` of signal.
    pub fn duration(self, seconds: f64) -> Self {
        let n = (seconds * self.sample_rate_hz).round().max(0.0) as u64;
        self.take_samples(n)
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    /// Generate the next sample regardless of any limit.
    pub fn next_sample(&mut self) -> RawSample {
        let t = self.index as f64 / self.sample_rate_hz;
        self.index += 1;

        let gravity = GravityCanceller::new(self.scale.standard_gravity).gravity_vector(&self.tilt);
        let phase = 2.0 * std::f64::consts::PI * self.breath_hz * t;
        let motion = self.axis.unit() * (self.amplitude_ms2 * phase.sin());
        let mut accel = gravity + motion;
        if let Some(noise) = self.noise {
            for c in accel.iter_mut() {
                *c += noise.sample(&mut self.rng);
            }
        }

        let counts = |ms2: f64| self.scale.ms2_to_accel(ms2).round();
        RawSample {
            timestamp_ms: self.start_timestamp_ms + (t * 1000.0).round() as i64,
            accel: Axes::new(counts(accel.x), counts(accel.y), counts(accel.z)),
            gyro: Some(Axes::default()),
        }
    }
}

impl Iterator for SyntheticBreather {
    type Item = RawSample;

    fn next(&mut self) -> Option<RawSample> {
        if self.limit.is_some_and(|n| self.index >= n) {
            return None;
        }
        Some(self.next_sample())
    }
}
