//! Fixed-period tick loop that drives a [`MonitorSession`].
//!
//! The reader task owns the input source and pushes lines into a bounded
//! channel; this loop owns the session and only ever `try_recv`s, so a
//! tick never waits on I/O. Each tick is one atomic unit of work: drain up
//! to `max_lines_per_tick` lines, process them, publish a snapshot.

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::session::{MonitorSession, SessionStats};
use crate::config::defaults::PROGRESS_LOG_INTERVAL;
use crate::types::LiveSnapshot;

/// Owns everything the tick loop touches.
///
/// Built with [`new()`](ProcessingLoop::new), optionally given a snapshot
/// publisher with [`with_publisher()`](ProcessingLoop::with_publisher),
/// then consumed by [`run()`](ProcessingLoop::run).
pub struct ProcessingLoop {
    session: MonitorSession,
    lines: mpsc::Receiver<String>,
    cancel_token: CancellationToken,
    tick_period: Duration,
    max_lines_per_tick: usize,
    publisher: Option<watch::Sender<LiveSnapshot>>,
}

impl ProcessingLoop {
    pub fn new(
        session: MonitorSession,
        lines: mpsc::Receiver<String>,
        cancel_token: CancellationToken,
        tick_period: Duration,
        max_lines_per_tick: usize,
    ) -> Self {
        Self {
            session,
            lines,
            cancel_token,
            tick_period,
            max_lines_per_tick: max_lines_per_tick.max(1),
            publisher: None,
        }
    }

    /// Publish a [`LiveSnapshot`] after every tick that consumed input.
    pub fn with_publisher(mut self, publisher: watch::Sender<LiveSnapshot>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Tick until the input channel closes or cancellation, then close the
    /// session log. Returns final session statistics.
    pub async fn run(mut self) -> SessionStats {
        let mut interval = tokio::time::interval(self.tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut batch: Vec<String> = Vec::with_capacity(self.max_lines_per_tick);
        let mut next_progress = PROGRESS_LOG_INTERVAL;
        let mut ticks = 0u64;

        info!("📊 Monitoring breathing signal...");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[TickLoop] Shutdown signal received");
                    break;
                }
                _ = interval.tick() => {}
            }
            ticks += 1;

            let input_closed = self.drain_into(&mut batch);
            if !batch.is_empty() {
                self.session.tick(batch.drain(..), Instant::now());
                self.publish();

                let processed = self.session.samples_processed();
                if processed >= next_progress {
                    next_progress = processed + PROGRESS_LOG_INTERVAL;
                    log_progress(&self.session.snapshot());
                }
            }

            if input_closed {
                info!(ticks = ticks, "[TickLoop] Input closed");
                break;
            }
        }

        // Lines still queued after cancellation are dropped
        self.publish();

        let stats = self.session.finish();
        log_final_stats(&stats);
        stats
    }

    /// Move up to `max_lines_per_tick` queued lines into `batch`.
    /// Returns `true` once the sender side is gone and the queue is empty.
    fn drain_into(&mut self, batch: &mut Vec<String>) -> bool {
        while batch.len() < self.max_lines_per_tick {
            match self.lines.try_recv() {
                Ok(line) => batch.push(line),
                Err(mpsc::error::TryRecvError::Empty) => return false,
                Err(mpsc::error::TryRecvError::Disconnected) => return true,
            }
        }
        false
    }

    fn publish(&self) {
        if let Some(ref tx) = self.publisher {
            // No receivers is fine; the display is optional
            let _ = tx.send(self.session.snapshot());
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn log_progress(snap: &LiveSnapshot) {
    let bpm = snap
        .rate
        .as_ref()
        .map_or_else(|| "undefined".to_string(), |r| format!("{:.1}", r.breaths_per_minute));
    info!(
        "📈 Progress: {} samples | {:?} | window {} pts | rate {} bpm | rejected {}",
        snap.samples_processed,
        snap.phase,
        snap.window.len(),
        bpm,
        snap.lines_rejected
    );
}

fn log_final_stats(stats: &SessionStats) {
    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("📊 FINAL STATISTICS");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("   Samples Processed:    {}", stats.samples_processed);
    info!("   Lines Rejected:       {}", stats.lines_rejected);
    info!("   Log Rows Written:     {}", stats.log_rows_written);
    info!("   Log Write Failures:   {}", stats.log_write_failures);
    info!("   Live Window Points:   {}", stats.window_points);
    match stats.final_rate {
        Some(ref rate) => info!(
            "   Breath Rate:          {:.1} bpm ({} peaks over {:.1} s)",
            rate.breaths_per_minute,
            rate.peak_count(),
            rate.duration_s
        ),
        None => info!("   Breath Rate:          undefined"),
    }
    if let Some(ref path) = stats.log_path {
        info!("   Session Log:          {}", path.display());
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
