use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::http::response::error_response;
use crate::http::server::AppState;
use crate::resilience::{BreakerSnapshot, CircuitState};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub providers: usize,
    pub open_circuits: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let registry = state.processor.providers();
    let open_circuits = registry
        .snapshots()
        .iter()
        .filter(|s| s.state != CircuitState::Closed)
        .count();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if open_circuits == 0 { "operational" } else { "degraded" },
        uptime_secs: state.started_at.elapsed().as_secs(),
        providers: registry.len(),
        open_circuits,
    })
}

pub async fn get_breakers(State(state): State<AppState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.processor.providers().snapshots())
}

pub async fn reset_breaker(State(state): State<AppState>, Path(provider): Path<String>) -> Response {
    match state.processor.providers().resolve(&provider) {
        Some(route) => {
            route.breaker.reset();
            Json(route.breaker.snapshot()).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            "PROVIDER_NOT_FOUND",
            format!("provider {} not found", provider),
        ),
    }
}
