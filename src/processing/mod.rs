//! Signal processing module - per-sample numeric stages of the breathing pipeline
//!
//! ```text
//! PhysicalSample -> OrientationTracker -> GravityCanceller
//!                -> IncrementalProjector -> ExponentialSmoother
//! ```
//!
//! [`BreathRateEstimator`] runs separately over a smoothed series.
//! Every stage is plain owned state with `&mut self` updates; none of them
//! lock, allocate per sample, or perform I/O.

mod gravity;
mod orientation;
mod peaks;
mod projector;
mod smoother;

pub use gravity::GravityCanceller;
pub use orientation::OrientationTracker;
pub use peaks::{find_peaks, peak_prominence, BreathRateEstimator, DegenerateEstimate};
pub use projector::IncrementalProjector;
pub use smoother::ExponentialSmoother;
