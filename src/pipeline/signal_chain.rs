//! Per-sample signal chain: raw sample in, smoothed scalar out.
//!
//! One chain serves every deployment variant. [`Capabilities`] decide
//! whether gyro rates feed the orientation filter and whether gravity is
//! cancelled before projection.

use crate::config::{Capabilities, MonitorConfig};
use crate::processing::{
    ExponentialSmoother, GravityCanceller, IncrementalProjector, OrientationTracker,
};
use crate::types::{Orientation, PhysicalSample, RawSample, SensorScale, Vec3};

/// Intermediate values for one processed sample.
#[derive(Debug, Clone, Copy)]
pub struct ChainOutput {
    pub orientation: Orientation,
    /// Vector handed to the projector (gravity-cancelled when enabled)
    pub projector_input: Vec3,
    pub projected: f64,
    pub smoothed: f64,
}

#[derive(Debug, Clone)]
pub struct SignalChain {
    scale: SensorScale,
    capabilities: Capabilities,
    nominal_dt_s: f64,
    tracker: OrientationTracker,
    canceller: GravityCanceller,
    projector: IncrementalProjector,
    smoother: ExponentialSmoother,
}

impl SignalChain {
    pub fn new(config: &MonitorConfig) -> Self {
        Self::with_capabilities(config, config.capabilities())
    }

    pub fn with_capabilities(config: &MonitorConfig, capabilities: Capabilities) -> Self {
        if capabilities.cancel_gravity && !capabilities.has_gyro {
            tracing::warn!("Gravity cancellation without gyro: orientation follows accelerometer tilt only");
        }
        Self {
            scale: config.sensor_scale(),
            capabilities,
            nominal_dt_s: config.filter.nominal_dt_s,
            tracker: OrientationTracker::new(config.filter.complementary_alpha),
            canceller: GravityCanceller::new(config.sensor.standard_gravity),
            projector: IncrementalProjector::new(),
            smoother: ExponentialSmoother::new(config.filter.ema_alpha),
        }
    }

    /// Run one decoded sample through every stage.
    pub fn process(&mut self, raw: &RawSample) -> ChainOutput {
        let physical = PhysicalSample::from_raw(raw, &self.scale);

        let (orientation, projector_input) = if self.capabilities.cancel_gravity {
            let gyro = if self.capabilities.has_gyro {
                physical.gyro_rad_s
            } else {
                Vec3::zeros()
            };
            let o = self
                .tracker
                .update(&gyro, &physical.accel_ms2, self.nominal_dt_s);
            (o, self.canceller.cancel(&o, &physical.accel_ms2))
        } else {
            (self.tracker.orientation(), physical.accel_ms2)
        };

        let projected = self.projector.observe(&projector_input);
        let smoothed = self.smoother.smooth(projected);

        ChainOutput {
            orientation,
            projector_input,
            projected,
            smoothed,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn samples_absorbed(&self) -> u64 {
        self.projector.count()
    }
}
