//! Shared data structures for the breathing monitor pipeline
//!
//! This module defines the core types passed between pipeline stages:
//! - RawSample / Axes (decoded sensor line, raw LSB units)
//! - PhysicalSample (SI units: m/s², rad/s)
//! - Orientation (roll/pitch state of the complementary filter)
//! - SmoothedPoint (canonical pipeline output, logged and displayed)
//! - Peak / RateEstimate (breath-rate estimator output)
//! - LiveSnapshot (per-tick view handed to the display boundary)

mod sample;
mod series;

pub use sample::*;
pub use series::*;
