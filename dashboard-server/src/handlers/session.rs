//! Read-only session views

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use skimsim_core::{seed_accounts, Account, ChartSeries, LogEntry, Snapshot};

use crate::AppState;

pub async fn snapshot(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.controller.snapshot())
}

pub async fn logs(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.controller.logs())
}

pub async fn chart(State(state): State<AppState>) -> Json<ChartSeries> {
    Json(ChartSeries::from_logs(&state.controller.logs()))
}

pub async fn accounts() -> Json<&'static [Account]> {
    Json(seed_accounts())
}

/// Server-Sent Events: the current snapshot, then one per change
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let updates = state.controller.subscribe();

    let stream = stream::unfold((updates, true), |(mut updates, first)| async move {
        if !first && updates.changed().await.is_err() {
            return None;
        }

        let snapshot = updates.borrow_and_update().clone();
        let event = Event::default()
            .event("snapshot")
            .json_data(&snapshot)
            .unwrap_or_else(|e| {
                tracing::error!("Failed to encode snapshot: {}", e);
                Event::default().comment("encode error")
            });

        Some((Ok(event), (updates, false)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
