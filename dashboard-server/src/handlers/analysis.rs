//! Vulnerability analysis handler

use axum::{extract::State, Json};
use skimsim_core::AnalysisOutcome;

use crate::{AppResult, AppState};

/// Run one analysis of the current log. Service failures come back as the
/// fallback report, not as an error status.
pub async fn analyze(State(state): State<AppState>) -> AppResult<Json<AnalysisOutcome>> {
    let outcome = state.controller.analyze().await?;

    if let Some(reason) = &outcome.fallback_reason {
        tracing::warn!("Analysis degraded to fallback report: {}", reason);
    } else {
        tracing::info!(
            score = outcome.result.vulnerability_score,
            threat = %outcome.result.threat_type,
            "Vulnerability report generated"
        );
    }

    Ok(Json(outcome))
}
