//! Peak-based breath-rate estimation.
//!
//! A breath is a local maximum of the smoothed waveform that stands at
//! least `min_prominence` above its higher adjoining valley and lies at
//! least `min_distance_samples` after the previously accepted breath.
//! The same routine serves the live trailing window and a whole recorded
//! session.

use thiserror::Error;

use crate::types::{Peak, RateEstimate, SmoothedPoint};

/// Why a series cannot yield a rate. Reported as an undefined rate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DegenerateEstimate {
    #[error("need at least 2 points, have {have}")]
    TooFewPoints { have: usize },

    #[error("series covers zero duration")]
    ZeroDuration,
}

#[derive(Debug, Clone, Copy)]
pub struct BreathRateEstimator {
    pub min_distance_samples: usize,
    pub min_prominence: f64,
}

impl Default for BreathRateEstimator {
    fn default() -> Self {
        Self {
            min_distance_samples: crate::config::defaults::MIN_PEAK_DISTANCE_SAMPLES,
            min_prominence: crate::config::defaults::MIN_PEAK_PROMINENCE,
        }
    }
}

impl BreathRateEstimator {
    pub const fn new(min_distance_samples: usize, min_prominence: f64) -> Self {
        Self {
            min_distance_samples,
            min_prominence,
        }
    }

    /// Breaths per minute over `series`.
    ///
    /// `bpm = peak_count / (t_last - t_first) * 60`. Peak indices refer to
    /// positions in `series`.
    pub fn estimate(&self, series: &[SmoothedPoint]) -> Result<RateEstimate, DegenerateEstimate> {
        let (first, last) = match series {
            [first, .., last] => (first, last),
            _ => return Err(DegenerateEstimate::TooFewPoints { have: series.len() }),
        };

        let duration_s = last.elapsed_time_s - first.elapsed_time_s;
        // Also catches NaN
        if !(duration_s > 0.0) {
            return Err(DegenerateEstimate::ZeroDuration);
        }

        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        let peaks: Vec<Peak> = find_peaks(&values, self.min_distance_samples, self.min_prominence)
            .into_iter()
            .map(|index| Peak {
                index,
                time_s: series[index].elapsed_time_s,
                value: series[index].value,
            })
            .collect();

        Ok(RateEstimate {
            breaths_per_minute: peaks.len() as f64 / duration_s * 60.0,
            peaks,
            duration_s,
        })
    }
}

/// Indices of accepted peaks, ascending.
///
/// Candidates are local maxima (a flat top counts once, at its middle
/// sample rounded left). Prominence filtering runs first, then spacing is
/// enforced greedily from the left: the first qualifying maximum wins and
/// suppresses candidates closer than `min_distance` samples.
pub fn find_peaks(values: &[f64], min_distance: usize, min_prominence: f64) -> Vec<usize> {
    let mut accepted: Vec<usize> = Vec::new();
    for peak in local_maxima(values) {
        if peak_prominence(values, peak) < min_prominence {
            continue;
        }
        if let Some(&prev) = accepted.last() {
            if peak - prev < min_distance {
                continue;
            }
        }
        accepted.push(peak);
    }
    accepted
}

fn local_maxima(values: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if values.len() < 3 {
        return maxima;
    }

    let last = values.len() - 1;
    let mut i = 1;
    while i < last {
        if values[i - 1] < values[i] {
            // Walk across a plateau
            let mut ahead = i + 1;
            while ahead < last && values[ahead] == values[i] {
                ahead += 1;
            }
            if values[ahead] < values[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    maxima
}

/// Topographic prominence of `values[peak]`.
///
/// On each side the search extends until a strictly higher sample or the
/// series edge; the prominence is the peak height above the higher of the
/// two minima found.
pub fn peak_prominence(values: &[f64], peak: usize) -> f64 {
    let height = values[peak];

    let mut left_min = height;
    for &v in values[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &values[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_series(period_s: f64, rate_hz: f64, seconds: f64, amplitude: f64) -> Vec<SmoothedPoint> {
        let n = (seconds * rate_hz) as usize;
        (0..n)
            .map(|i| {
                let t = i as f64 / rate_hz;
                SmoothedPoint::new(t, amplitude * (2.0 * std::f64::consts::PI * t / period_s).sin())
            })
            .collect()
    }

    #[test]
    fn test_four_second_sine_is_fifteen_bpm() {
        let series = sine_series(4.0, 20.0, 60.0, 0.5);
        let est = BreathRateEstimator::new(20, 0.05).estimate(&series).unwrap();
        assert!((est.breaths_per_minute - 15.0).abs() <= 1.0, "bpm = {}", est.breaths_per_minute);
        assert!(est.peak_count() == 15 || est.peak_count() == 16);
        assert!((est.peaks[0].time_s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sign_of_waveform_does_not_change_rate() {
        let series = sine_series(4.0, 20.0, 60.0, 0.5);
        let flipped: Vec<SmoothedPoint> = series
            .iter()
            .map(|p| SmoothedPoint::new(p.elapsed_time_s, -p.value))
            .collect();
        let est = BreathRateEstimator::default();
        let a = est.estimate(&series).unwrap();
        let b = est.estimate(&flipped).unwrap();
        assert!((a.breaths_per_minute - b.breaths_per_minute).abs() <= 1.0);
    }

    #[test]
    fn test_single_point_is_undefined() {
        let est = BreathRateEstimator::default();
        assert_eq!(
            est.estimate(&[SmoothedPoint::new(0.0, 1.0)]),
            Err(DegenerateEstimate::TooFewPoints { have: 1 })
        );
        assert_eq!(
            est.estimate(&[]),
            Err(DegenerateEstimate::TooFewPoints { have: 0 })
        );
    }

    #[test]
    fn test_zero_duration_is_undefined() {
        let est = BreathRateEstimator::default();
        let series = [SmoothedPoint::new(2.0, 0.0), SmoothedPoint::new(2.0, 1.0)];
        assert_eq!(est.estimate(&series), Err(DegenerateEstimate::ZeroDuration));
    }

    #[test]
    fn test_flat_series_has_no_peaks() {
        let series: Vec<SmoothedPoint> = (0..100)
            .map(|i| SmoothedPoint::new(i as f64 * 0.05, 0.2))
            .collect();
        let est = BreathRateEstimator::default().estimate(&series).unwrap();
        assert_eq!(est.peak_count(), 0);
        assert_eq!(est.breaths_per_minute, 0.0);
    }

    #[test]
    fn test_prominence_measured_against_higher_valley() {
        //            0    1    2    3    4    5    6
        let v = [0.0, 1.0, 0.6, 0.8, 0.1, 2.0, 0.0];
        assert!((peak_prominence(&v, 1) - 0.9).abs() < 1e-12);
        // Peak 3 is bounded by 0.6 on the left (1.0 is higher) and 0.1 on the right
        assert!((peak_prominence(&v, 3) - 0.2).abs() < 1e-12);
        assert!((peak_prominence(&v, 5) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_small_ripples_are_rejected() {
        let v = [0.0, 1.0, 0.98, 0.99, 0.0];
        assert_eq!(find_peaks(&v, 1, 0.05), vec![1]);
        assert_eq!(find_peaks(&v, 1, 0.0), vec![1, 3]);
    }

    #[test]
    fn test_first_peak_suppresses_close_successors() {
        let v = [0.0, 1.0, 0.0, 2.0, 0.0, 1.0, 0.0];
        // Greedy from the left keeps index 1 even though index 3 is taller
        assert_eq!(find_peaks(&v, 3, 0.0), vec![1, 5]);
        assert_eq!(find_peaks(&v, 2, 0.0), vec![1, 3, 5]);
    }

    #[test]
    fn test_plateau_counts_once_at_middle() {
        let v = [0.0, 1.0, 1.0, 1.0, 1.0, 0.0];
        assert_eq!(find_peaks(&v, 1, 0.0), vec![2]);
        // Plateau running into the edge is not a peak
        let edge = [0.0, 1.0, 1.0];
        assert!(find_peaks(&edge, 1, 0.0).is_empty());
    }
}
