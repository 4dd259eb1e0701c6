//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Typing jobs
        .route("/start", post(handlers::typing::start_typing))
        .route("/status/{job_id}", get(handlers::typing::get_status))
        .route("/stop/{job_id}", post(handlers::typing::stop_typing))
        .nest("/vc", voice_routes())
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// Voice channel presence routes
fn voice_routes() -> Router<AppState> {
    Router::new()
        .route("/connect", post(handlers::voice::connect))
        .route("/disconnect", post(handlers::voice::disconnect))
        .route("/status/{connection_id}", get(handlers::voice::status))
}
