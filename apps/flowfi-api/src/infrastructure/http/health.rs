//! Health Check and Metrics Endpoints
//!
//! Used by container orchestrators, load balancers, and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /` - Plain banner
//! - `GET /health` - JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /metrics` - Prometheus metrics in text format

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use super::controller::AppState;
use super::response::{ApiVersions, HealthResponse};
use crate::application::ports::StreamRepository;
use crate::infrastructure::metrics::get_metrics_handle;

pub(super) async fn root_handler() -> &'static str {
    "FlowFi Backend is running"
}

pub(super) async fn health_handler<R>(State(state): State<AppState<R>>) -> Json<HealthResponse>
where
    R: StreamRepository,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        version: state.version.clone(),
        api_versions: ApiVersions::default(),
        subscribers: state.registry.total_subscribers(),
    })
}

pub(super) async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub(super) async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}
