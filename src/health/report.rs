//! Liveness and readiness endpoints.
//!
//! Handlers only read the current snapshot; they never wait on the
//! recovery loop or the fault trap.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::config::ProbeConfig;
use crate::health::state::{HealthState, ProbeStatus};

/// Router exposing both probes at the configured paths.
pub fn probe_router(state: Arc<HealthState>, config: &ProbeConfig) -> Router {
    Router::new()
        .route(&config.liveness_path, get(liveness_handler))
        .route(&config.readiness_path, get(readiness_handler))
        .with_state(state)
}

/// 200 unless the process has been marked dead.
pub async fn liveness_handler(State(state): State<Arc<HealthState>>) -> Response {
    render(&state.liveness())
}

/// 200 while ready, 503 otherwise. The body carries the diagnostic.
pub async fn readiness_handler(State(state): State<Arc<HealthState>>) -> Response {
    render(&state.readiness())
}

fn render(status: &ProbeStatus) -> Response {
    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = match (status.healthy, status.message.is_empty()) {
        (true, true) => "Healthy".to_string(),
        (false, true) => "Unhealthy".to_string(),
        _ => status.message.clone(),
    };

    (code, body).into_response()
}
