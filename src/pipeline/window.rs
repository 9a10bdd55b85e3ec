//! Time-bounded series buffer and the warm-up gate in front of it.

use std::collections::VecDeque;

use crate::config::ClipRange;
use crate::types::{SessionPhase, SmoothedPoint};

// ============================================================================
// Windowed Series
// ============================================================================

/// Insertion-ordered series of smoothed points.
///
/// A bounded series evicts from the front on every append so that
/// `newest - oldest <= max_age_s`. An unbounded series never evicts.
/// Points older than the current newest are refused, so the series is
/// time-sorted by construction.
#[derive(Debug, Clone, Default)]
pub struct WindowedSeries {
    points: VecDeque<SmoothedPoint>,
    max_age_s: Option<f64>,
}

impl WindowedSeries {
    pub fn bounded(max_age_s: f64) -> Self {
        Self {
            points: VecDeque::new(),
            max_age_s: Some(max_age_s),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Append a point, evicting expired points if bounded.
    ///
    /// Returns `false` (and stores nothing) when the point is not finite or
    /// would break time order.
    pub fn append(&mut self, point: SmoothedPoint) -> bool {
        if !point.elapsed_time_s.is_finite() || !point.value.is_finite() {
            return false;
        }
        if let Some(newest) = self.points.back() {
            if point.elapsed_time_s < newest.elapsed_time_s {
                tracing::debug!(
                    t = point.elapsed_time_s,
                    newest = newest.elapsed_time_s,
                    "Dropping out-of-order point"
                );
                return false;
            }
        }
        self.points.push_back(point);
        if let Some(max_age) = self.max_age_s {
            self.evict_older_than(max_age);
        }
        true
    }

    /// Drop points from the front while the span exceeds `max_age_s`.
    /// Returns the number evicted.
    pub fn evict_older_than(&mut self, max_age_s: f64) -> usize {
        let mut evicted = 0;
        while let (Some(oldest), Some(newest)) = (self.points.front(), self.points.back()) {
            if newest.elapsed_time_s - oldest.elapsed_time_s <= max_age_s {
                break;
            }
            self.points.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Ordered copy of the stored points.
    pub fn values(&self) -> Vec<SmoothedPoint> {
        self.points.iter().copied().collect()
    }

    /// Display transform: a copy with values clamped to `range`.
    /// Stored values are untouched.
    pub fn clip(&self, range: ClipRange) -> Vec<SmoothedPoint> {
        clip_points(self.points.iter(), range)
    }

    /// Points within `duration_s` of the newest point.
    pub fn tail(&self, duration_s: f64) -> Vec<SmoothedPoint> {
        let Some(newest) = self.points.back() else {
            return Vec::new();
        };
        let cutoff = newest.elapsed_time_s - duration_s;
        let start = self.points.partition_point(|p| p.elapsed_time_s < cutoff);
        self.points.range(start..).copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SmoothedPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// `newest - oldest`, or 0 when fewer than two points.
    pub fn span(&self) -> f64 {
        match (self.points.front(), self.points.back()) {
            (Some(a), Some(b)) => b.elapsed_time_s - a.elapsed_time_s,
            _ => 0.0,
        }
    }

    pub fn newest(&self) -> Option<&SmoothedPoint> {
        self.points.back()
    }

    pub fn max_age_s(&self) -> Option<f64> {
        self.max_age_s
    }
}

/// Clamp each value into `range`, keeping times.
pub fn clip_points<'a>(
    points: impl IntoIterator<Item = &'a SmoothedPoint>,
    range: ClipRange,
) -> Vec<SmoothedPoint> {
    points
        .into_iter()
        .map(|p| SmoothedPoint::new(p.elapsed_time_s, p.value.clamp(range.min, range.max)))
        .collect()
}

// ============================================================================
// Warm-up Gate
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum GateState {
    Warming,
    /// Display time origin, in session elapsed seconds
    Live { origin_s: f64 },
}

/// Keeps the first `ignore_initial_s` of a session off the display.
///
/// `Warming -> Live` happens exactly once, on the first point at or past
/// the threshold; that point becomes display time 0.
#[derive(Debug, Clone)]
pub struct WarmupGate {
    ignore_initial_s: f64,
    state: GateState,
}

impl WarmupGate {
    pub const fn new(ignore_initial_s: f64) -> Self {
        Self {
            ignore_initial_s,
            state: GateState::Warming,
        }
    }

    /// Display time for a point at session time `elapsed_s`, or `None`
    /// while warming up.
    pub fn admit(&mut self, elapsed_s: f64) -> Option<f64> {
        match self.state {
            GateState::Warming if elapsed_s < self.ignore_initial_s => None,
            GateState::Warming => {
                self.state = GateState::Live { origin_s: elapsed_s };
                tracing::info!(
                    origin_s = elapsed_s,
                    "Warm-up complete, live display started"
                );
                Some(0.0)
            }
            GateState::Live { origin_s } => Some(elapsed_s - origin_s),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            GateState::Warming => SessionPhase::Warming,
            GateState::Live { .. } => SessionPhase::Live,
        }
    }

    /// Session time that maps to display time 0, once live.
    pub fn origin_s(&self) -> Option<f64> {
        match self.state {
            GateState::Warming => None,
            GateState::Live { origin_s } => Some(origin_s),
        }
    }
}
