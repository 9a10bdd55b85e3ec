//! API route handlers

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::ClipRange;
use crate::pipeline::clip_points;
use crate::types::{LiveSnapshot, SessionPhase, SmoothedPoint};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct DashboardState {
    /// Latest snapshot published by the tick loop
    pub snapshot: watch::Receiver<LiveSnapshot>,
    /// Display clamp applied to waveform responses
    pub clip: ClipRange,
    /// Trailing span used by the live estimate (reported with the rate)
    pub live_window_s: f64,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(snapshot: watch::Receiver<LiveSnapshot>, clip: ClipRange, live_window_s: f64) -> Self {
        Self {
            snapshot,
            clip,
            live_window_s,
            started_at: Utc::now(),
        }
    }
}

// ============================================================================
// Health Endpoint
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub phase: SessionPhase,
    pub samples_processed: u64,
    pub lines_rejected: u64,
    pub log_rows_written: u64,
    pub log_write_failures: u64,
    pub uptime_secs: i64,
}

/// GET /api/v1/health
pub async fn get_health(State(state): State<DashboardState>) -> Json<HealthResponse> {
    let snap = state.snapshot.borrow();
    let status = if snap.log_write_failures > 0 {
        "degraded"
    } else {
        "ok"
    };
    Json(HealthResponse {
        status: status.to_string(),
        phase: snap.phase,
        samples_processed: snap.samples_processed,
        lines_rejected: snap.lines_rejected,
        log_rows_written: snap.log_rows_written,
        log_write_failures: snap.log_write_failures,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

// ============================================================================
// Waveform Endpoint
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct WaveformQuery {
    /// Only return points newer than this display time (seconds)
    pub since: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WaveformResponse {
    pub phase: SessionPhase,
    pub clip_min: f64,
    pub clip_max: f64,
    pub points: Vec<SmoothedPoint>,
}

/// GET /api/v1/waveform?since=<seconds>
pub async fn get_waveform(
    State(state): State<DashboardState>,
    Query(query): Query<WaveformQuery>,
) -> Json<WaveformResponse> {
    let snap = state.snapshot.borrow();
    let since = query.since.unwrap_or(f64::NEG_INFINITY);
    let points = clip_points(
        snap.window.iter().filter(|p| p.elapsed_time_s > since),
        state.clip,
    );
    Json(WaveformResponse {
        phase: snap.phase,
        clip_min: state.clip.min,
        clip_max: state.clip.max,
        points,
    })
}

// ============================================================================
// Rate Endpoint
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RateResponse {
    /// `null` while the rate is undefined
    pub breaths_per_minute: Option<f64>,
    pub peak_count: usize,
    pub peak_times: Vec<f64>,
    pub duration_s: Option<f64>,
    pub live_window_s: f64,
    pub reason: Option<String>,
}

/// GET /api/v1/rate
pub async fn get_rate(State(state): State<DashboardState>) -> Json<RateResponse> {
    let snap = state.snapshot.borrow();
    let response = match snap.rate {
        Some(ref rate) => RateResponse {
            breaths_per_minute: Some(rate.breaths_per_minute),
            peak_count: rate.peak_count(),
            peak_times: rate.peak_times(),
            duration_s: Some(rate.duration_s),
            live_window_s: state.live_window_s,
            reason: None,
        },
        None => RateResponse {
            breaths_per_minute: None,
            peak_count: 0,
            peak_times: Vec::new(),
            duration_s: None,
            live_window_s: state.live_window_s,
            reason: Some(
                snap.rate_undefined_reason
                    .clone()
                    .unwrap_or_else(|| "no estimate yet".to_string()),
            ),
        },
    };
    Json(response)
}
