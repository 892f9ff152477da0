//! Liveness plus a one-line view of the session

use axum::{extract::State, Json};
use serde::Serialize;
use skimsim_core::AttackState;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    stage: AttackState,
    run_in_progress: bool,
    analysis_in_flight: bool,
    analysis_provider: String,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.controller.snapshot();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        stage: snapshot.state,
        run_in_progress: snapshot.run_in_progress,
        analysis_in_flight: snapshot.analysis_in_flight,
        analysis_provider: state.controller.analysis_provider().to_string(),
    })
}
