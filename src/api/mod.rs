//! REST API module using Axum
//!
//! Read-only display boundary over the live session:
//! - `/api/v1/health`   - session status and counters
//! - `/api/v1/waveform` - live window, clipped for display
//! - `/api/v1/rate`     - latest continuous breath-rate estimate
//!
//! Handlers read the latest [`LiveSnapshot`](crate::types::LiveSnapshot)
//! from a `watch` channel; they never touch pipeline state. Chart
//! rendering is left to the client.

pub mod handlers;

pub use handlers::DashboardState;

use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable with a comma-separated list of allowed origins.
pub const CORS_ORIGINS_ENV_VAR: &str = "BREATH_MONITOR_CORS_ORIGINS";

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `BREATH_MONITOR_CORS_ORIGINS` to a comma-separated list of allowed
/// origins for a chart served from elsewhere (e.g. `http://localhost:5173`).
fn build_cors_layer() -> CorsLayer {
    match std::env::var(CORS_ORIGINS_ENV_VAR) {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods([Method::GET])
                .allow_headers([header::CONTENT_TYPE])
        }
        Err(_) => CorsLayer::new()
            .allow_methods([Method::GET])
            .allow_headers([header::CONTENT_TYPE]),
    }
}

/// v1 display routes.
pub fn api_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/waveform", get(handlers::get_waveform))
        .route("/rate", get(handlers::get_rate))
        .with_state(state)
}

/// Create the complete application router.
pub fn create_app(state: DashboardState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}
