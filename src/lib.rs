//! Breath Monitor: respiration waveform and breath rate from a wearable IMU
//!
//! Streaming pipeline from raw accelerometer/gyroscope lines to a smoothed
//! breathing waveform and a breaths-per-minute estimate.
//!
//! ## Architecture
//!
//! - **Acquisition**: line decoder for the sensor bridge JSON protocol
//! - **Processing**: orientation tracking, gravity cancellation, online
//!   projection, smoothing and peak-based rate estimation
//! - **Pipeline**: single-owner session state driven by a fixed-period tick
//! - **Storage**: flat two-column session log and its reader
//! - **API**: optional read-only display endpoints

pub mod acquisition;
pub mod api;
pub mod config;
pub mod pipeline;
pub mod processing;
pub mod simulation;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::{Capabilities, ClipRange, InputFormat, MonitorConfig, TimeBase};

// Re-export commonly used types
pub use types::{
    Axes, LiveSnapshot, Orientation, Peak, PhysicalSample, RateEstimate, RawSample, SensorScale,
    SessionPhase, SmoothedPoint, Vec3,
};

// Re-export pipeline stages
pub use processing::{
    BreathRateEstimator, DegenerateEstimate, ExponentialSmoother, GravityCanceller,
    IncrementalProjector, OrientationTracker,
};

// Re-export session components
pub use pipeline::{MonitorSession, ProcessingLoop, SessionStats, SignalChain, WindowedSeries};

// Re-export storage
pub use storage::{load_series, LogError, SeriesLog};
