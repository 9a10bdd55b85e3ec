//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the /api/v1/* display endpoints using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port.

use breath_monitor::api::handlers::{HealthResponse, RateResponse, WaveformResponse};
use breath_monitor::api::{create_app, DashboardState};
use breath_monitor::types::{LiveSnapshot, Peak, RateEstimate, SessionPhase, SmoothedPoint};
use breath_monitor::ClipRange;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tokio::sync::watch;
use tower::ServiceExt;

fn live_snapshot() -> LiveSnapshot {
    LiveSnapshot {
        phase: SessionPhase::Live,
        window: vec![
            SmoothedPoint::new(0.0, -3.0),
            SmoothedPoint::new(0.05, 0.5),
            SmoothedPoint::new(0.10, 4.0),
            SmoothedPoint::new(0.15, 1.0),
        ],
        rate: Some(RateEstimate {
            breaths_per_minute: 18.0,
            peaks: vec![
                Peak { index: 2, time_s: 0.10, value: 4.0 },
            ],
            duration_s: 3.333,
        }),
        rate_undefined_reason: None,
        samples_processed: 120,
        lines_rejected: 2,
        log_rows_written: 120,
        log_write_failures: 0,
    }
}

fn state_with(snapshot: LiveSnapshot) -> (watch::Sender<LiveSnapshot>, DashboardState) {
    let (tx, rx) = watch::channel(snapshot);
    let state = DashboardState::new(rx, ClipRange { min: -2.0, max: 2.0 }, 60.0);
    (tx, state)
}

async fn get_json<T: serde::de::DeserializeOwned>(state: DashboardState, uri: &str) -> T {
    let resp = create_app(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK, "{uri} should return 200");
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap_or_else(|e| panic!("{uri} returned invalid JSON: {e}"))
}

/// All v1 GET endpoints should return 200.
#[tokio::test]
async fn test_v1_get_endpoints_return_200() {
    let endpoints = ["/api/v1/health", "/api/v1/waveform", "/api/v1/rate"];

    for endpoint in &endpoints {
        let (_tx, state) = state_with(LiveSnapshot::default());
        let resp = create_app(state)
            .oneshot(Request::builder().uri(*endpoint).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{endpoint} should return 200");
    }
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (_tx, state) = state_with(LiveSnapshot::default());
    let resp = create_app(state)
        .oneshot(Request::builder().uri("/api/v1/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_counters() {
    let (_tx, state) = state_with(live_snapshot());
    let health: HealthResponse = get_json(state, "/api/v1/health").await;
    assert_eq!(health.status, "ok");
    assert_eq!(health.phase, SessionPhase::Live);
    assert_eq!(health.samples_processed, 120);
    assert_eq!(health.lines_rejected, 2);
}

#[tokio::test]
async fn test_health_degraded_after_log_failures() {
    let mut snap = live_snapshot();
    snap.log_write_failures = 3;
    let (_tx, state) = state_with(snap);
    let health: HealthResponse = get_json(state, "/api/v1/health").await;
    assert_eq!(health.status, "degraded");
    assert_eq!(health.log_write_failures, 3);
}

#[tokio::test]
async fn test_waveform_is_clipped_for_display() {
    let (_tx, state) = state_with(live_snapshot());
    let wave: WaveformResponse = get_json(state, "/api/v1/waveform").await;
    let values: Vec<f64> = wave.points.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![-2.0, 0.5, 2.0, 1.0]);
    assert_eq!((wave.clip_min, wave.clip_max), (-2.0, 2.0));
}

#[tokio::test]
async fn test_waveform_since_filters_older_points() {
    let (_tx, state) = state_with(live_snapshot());
    let wave: WaveformResponse = get_json(state, "/api/v1/waveform?since=0.05").await;
    let times: Vec<f64> = wave.points.iter().map(|p| p.elapsed_time_s).collect();
    assert_eq!(times, vec![0.10, 0.15]);
}

#[tokio::test]
async fn test_rate_defined() {
    let (_tx, state) = state_with(live_snapshot());
    let rate: RateResponse = get_json(state, "/api/v1/rate").await;
    assert_eq!(rate.breaths_per_minute, Some(18.0));
    assert_eq!(rate.peak_count, 1);
    assert_eq!(rate.peak_times, vec![0.10]);
    assert_eq!(rate.live_window_s, 60.0);
    assert!(rate.reason.is_none());
}

#[tokio::test]
async fn test_rate_undefined_serializes_null() {
    let mut snap = LiveSnapshot::default();
    snap.rate_undefined_reason = Some("too few points for a rate (have 1, need 2)".to_string());
    let (_tx, state) = state_with(snap);

    let resp = create_app(state)
        .oneshot(Request::builder().uri("/api/v1/rate").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["breaths_per_minute"].is_null());
    assert!(json["reason"].as_str().unwrap().contains("too few points"));
}

#[tokio::test]
async fn test_handlers_see_latest_published_snapshot() {
    let (tx, state) = state_with(LiveSnapshot::default());
    let before: HealthResponse = get_json(state.clone(), "/api/v1/health").await;
    assert_eq!(before.phase, SessionPhase::Warming);

    tx.send(live_snapshot()).unwrap();
    let after: HealthResponse = get_json(state, "/api/v1/health").await;
    assert_eq!(after.phase, SessionPhase::Live);
    assert_eq!(after.samples_processed, 120);
}
