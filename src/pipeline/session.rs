//! Monitoring session: the single owner of all per-session pipeline state.
//!
//! Everything mutable lives here and changes only through `&mut self`
//! methods called from the tick loop. A rejected line leaves the chain,
//! gate, window and rate state exactly as they were.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::signal_chain::SignalChain;
use super::window::{WarmupGate, WindowedSeries};
use crate::acquisition::{decode_line, DecodeError};
use crate::config::{InputFormat, MonitorConfig, TimeBase};
use crate::processing::BreathRateEstimator;
use crate::storage::{LogError, SeriesLog};
use crate::types::{LiveSnapshot, RateEstimate, SmoothedPoint};

// ============================================================================
// Outcomes
// ============================================================================

/// What happened to one input line.
#[derive(Debug)]
pub enum LineOutcome {
    /// Not decoded; nothing changed
    Rejected(DecodeError),
    /// Processed and logged during warm-up (session time)
    Logged(SmoothedPoint),
    /// Processed, logged and displayed (display time)
    Displayed(SmoothedPoint),
}

/// Per-tick tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub lines: usize,
    pub displayed: usize,
    pub rejected: usize,
}

/// End-of-session summary.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub samples_processed: u64,
    pub lines_rejected: u64,
    pub log_rows_written: u64,
    pub log_write_failures: u64,
    pub window_points: usize,
    pub final_rate: Option<RateEstimate>,
    pub log_path: Option<std::path::PathBuf>,
}

// ============================================================================
// Clock
// ============================================================================

/// Elapsed-time source for a session.
///
/// Output never decreases: an earlier timestamp is clamped to the previous
/// elapsed time so downstream series stay sorted.
#[derive(Debug, Clone)]
pub struct SessionClock {
    base: TimeBase,
    started: Instant,
    first_timestamp_ms: Option<i64>,
    last_elapsed_s: f64,
}

impl SessionClock {
    pub fn new(base: TimeBase, started: Instant) -> Self {
        Self {
            base,
            started,
            first_timestamp_ms: None,
            last_elapsed_s: 0.0,
        }
    }

    pub fn elapsed(&mut self, timestamp_ms: i64, now: Instant) -> f64 {
        let raw = match self.base {
            TimeBase::SampleTimestamp => {
                let first = *self.first_timestamp_ms.get_or_insert(timestamp_ms);
                timestamp_ms.saturating_sub(first) as f64 / 1000.0
            }
            TimeBase::WallClock => now.saturating_duration_since(self.started).as_secs_f64(),
        };
        if raw < self.last_elapsed_s {
            debug!(raw, clamped = self.last_elapsed_s, "Timestamp went backwards");
        }
        self.last_elapsed_s = raw.max(self.last_elapsed_s);
        self.last_elapsed_s
    }
}

// ============================================================================
// Live Rate
// ============================================================================

/// Periodic breath-rate estimate over the trailing part of the live window.
#[derive(Debug, Clone)]
pub struct LiveRateTracker {
    estimator: BreathRateEstimator,
    live_window_s: f64,
    recompute_interval_s: f64,
    next_due_s: f64,
    latest: Option<RateEstimate>,
    undefined_reason: Option<String>,
}

impl LiveRateTracker {
    pub fn new(estimator: BreathRateEstimator, live_window_s: f64, recompute_interval_s: f64) -> Self {
        Self {
            estimator,
            live_window_s,
            recompute_interval_s,
            next_due_s: recompute_interval_s,
            latest: None,
            undefined_reason: None,
        }
    }

    /// Recompute if `display_t` has reached the next due time.
    /// Returns `true` when an estimate was attempted.
    pub fn maybe_recompute(&mut self, window: &WindowedSeries, display_t: f64) -> bool {
        if display_t < self.next_due_s {
            return false;
        }
        self.next_due_s = display_t + self.recompute_interval_s;
        self.recompute(window);
        true
    }

    /// Estimate now, regardless of schedule.
    pub fn recompute(&mut self, window: &WindowedSeries) {
        let tail = window.tail(self.live_window_s);
        match self.estimator.estimate(&tail) {
            Ok(est) => {
                info!(
                    bpm = format_args!("{:.1}", est.breaths_per_minute),
                    peaks = est.peak_count(),
                    span_s = format_args!("{:.1}", est.duration_s),
                    "Live breath rate"
                );
                self.latest = Some(est);
                self.undefined_reason = None;
            }
            Err(reason) => {
                debug!(%reason, "Live breath rate undefined");
                self.latest = None;
                self.undefined_reason = Some(reason.to_string());
            }
        }
    }

    pub fn latest(&self) -> Option<&RateEstimate> {
        self.latest.as_ref()
    }

    pub fn undefined_reason(&self) -> Option<&str> {
        self.undefined_reason.as_deref()
    }
}

// ============================================================================
// Session
// ============================================================================

pub struct MonitorSession {
    input_format: InputFormat,
    clock: SessionClock,
    chain: SignalChain,
    gate: WarmupGate,
    window: WindowedSeries,
    log: SeriesLog,
    rate: LiveRateTracker,
    samples_processed: u64,
    lines_rejected: u64,
    log_write_failures: u64,
}

impl MonitorSession {
    /// Open the session log under `[session].log_dir` and build a cold session.
    ///
    /// Failing to create the log is fatal.
    pub fn start(config: &MonitorConfig) -> Result<Self, LogError> {
        let log = SeriesLog::create(&config.session.log_dir, &config.session.log_prefix)?;
        Ok(Self::new(config, log))
    }

    pub fn new(config: &MonitorConfig, log: SeriesLog) -> Self {
        Self::with_clock(config, log, Instant::now())
    }

    /// Build a session whose wall clock started at `started`.
    pub fn with_clock(config: &MonitorConfig, log: SeriesLog, started: Instant) -> Self {
        let estimator = BreathRateEstimator::new(
            config.rate.min_distance_samples,
            config.rate.min_prominence,
        );
        Self {
            input_format: config.sensor.input_format,
            clock: SessionClock::new(config.session.time_base, started),
            chain: SignalChain::new(config),
            gate: WarmupGate::new(config.window.ignore_initial_s),
            window: WindowedSeries::bounded(config.window.max_window_s),
            log,
            rate: LiveRateTracker::new(
                estimator,
                config.rate.live_window_s,
                config.rate.recompute_interval_s,
            ),
            samples_processed: 0,
            lines_rejected: 0,
            log_write_failures: 0,
        }
    }

    /// Decode and process one line.
    pub fn process_line(&mut self, line: &str, now: Instant) -> LineOutcome {
        let raw = match decode_line(line, self.input_format) {
            Ok(raw) => raw,
            Err(e) => {
                self.lines_rejected += 1;
                debug!(error = %e, "Discarding input line");
                return LineOutcome::Rejected(e);
            }
        };

        let elapsed = self.clock.elapsed(raw.timestamp_ms, now);
        let out = self.chain.process(&raw);
        let point = SmoothedPoint::new(elapsed, out.smoothed);
        self.samples_processed += 1;

        if let Err(e) = self.log.append(&point) {
            self.log_write_failures += 1;
            warn!(error = %e, failures = self.log_write_failures, "Session log write failed, continuing");
        }

        match self.gate.admit(elapsed) {
            None => LineOutcome::Logged(point),
            Some(display_t) => {
                let shown = SmoothedPoint::new(display_t, out.smoothed);
                if self.window.append(shown) {
                    self.rate.maybe_recompute(&self.window, display_t);
                }
                LineOutcome::Displayed(shown)
            }
        }
    }

    /// Process a batch of lines received in one tick.
    pub fn tick<I, S>(&mut self, lines: I, now: Instant) -> TickReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = TickReport::default();
        for line in lines {
            report.lines += 1;
            match self.process_line(line.as_ref(), now) {
                LineOutcome::Rejected(_) => report.rejected += 1,
                LineOutcome::Displayed(_) => report.displayed += 1,
                LineOutcome::Logged(_) => {}
            }
        }
        report
    }

    /// Current display view: warm-up filtered, not clipped.
    pub fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            phase: self.gate.phase(),
            window: self.window.values(),
            rate: self.rate.latest().cloned(),
            rate_undefined_reason: self.rate.undefined_reason().map(str::to_string),
            samples_processed: self.samples_processed,
            lines_rejected: self.lines_rejected,
            log_rows_written: self.log.rows_written(),
            log_write_failures: self.log_write_failures,
        }
    }

    /// Run the estimator over the live window now.
    pub fn refresh_rate(&mut self) -> Option<&RateEstimate> {
        self.rate.recompute(&self.window);
        self.rate.latest()
    }

    pub fn window(&self) -> &WindowedSeries {
        &self.window
    }

    pub fn samples_processed(&self) -> u64 {
        self.samples_processed
    }

    /// Flush and close the log.
    pub fn finish(mut self) -> SessionStats {
        let log_path = self.log.path().map(std::path::Path::to_path_buf);
        let final_rate = self.refresh_rate().cloned();
        let log_rows_written = match self.log.close() {
            Ok(rows) => rows,
            Err(e) => {
                self.log_write_failures += 1;
                warn!(error = %e, "Final session log flush failed");
                0
            }
        };
        SessionStats {
            samples_processed: self.samples_processed,
            lines_rejected: self.lines_rejected,
            log_rows_written,
            log_write_failures: self.log_write_failures,
            window_points: self.window.len(),
            final_rate,
            log_path,
        }
    }
}
