//! Waveform, peak and rate types

use serde::{Deserialize, Serialize};

/// One point of the smoothed breathing waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedPoint {
    /// Seconds since the time origin of the series the point belongs to
    pub elapsed_time_s: f64,
    /// Smoothed projected acceleration (arbitrary units, sign uninformative)
    pub value: f64,
}

impl SmoothedPoint {
    pub const fn new(elapsed_time_s: f64, value: f64) -> Self {
        Self {
            elapsed_time_s,
            value,
        }
    }
}

/// A detected breath (local maximum of the waveform).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Position in the series the estimator was run on
    pub index: usize,
    pub time_s: f64,
    pub value: f64,
}

/// Result of a successful breath-rate estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEstimate {
    pub breaths_per_minute: f64,
    pub peaks: Vec<Peak>,
    /// Span between the first and last point of the series (seconds)
    pub duration_s: f64,
}

impl RateEstimate {
    pub fn peak_count(&self) -> usize {
        self.peaks.len()
    }

    pub fn peak_times(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.time_s).collect()
    }
}

/// Display-side phase of a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Inside the initial ignore period; points are logged only
    #[default]
    Warming,
    /// Points are logged and displayed
    Live,
}

/// Per-tick view of the session handed to the display boundary.
///
/// `window` is warm-up filtered but NOT clipped; clipping is the renderer's job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LiveSnapshot {
    pub phase: SessionPhase,
    pub window: Vec<SmoothedPoint>,
    pub rate: Option<RateEstimate>,
    /// Reason the most recent live estimate was undefined, if it was
    pub rate_undefined_reason: Option<String>,
    pub samples_processed: u64,
    pub lines_rejected: u64,
    pub log_rows_written: u64,
    pub log_write_failures: u64,
}
