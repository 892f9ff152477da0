//! Attack simulation commands

use axum::{extract::State, http::StatusCode, Json};
use skimsim_core::Snapshot;

use crate::{AppResult, AppState};

/// Start the scripted run in the background
pub async fn start(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<Snapshot>)> {
    let run = state.controller.spawn_run()?;

    tokio::spawn(async move {
        match run.await {
            Ok(outcome) => tracing::info!(?outcome, "Attack run finished"),
            Err(e) => tracing::error!("Attack run task failed: {}", e),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(state.controller.snapshot())))
}

/// Back to idle; cancels a run in progress
pub async fn reset(State(state): State<AppState>) -> Json<Snapshot> {
    state.controller.reset();
    tracing::info!("Session reset");
    Json(state.controller.snapshot())
}
