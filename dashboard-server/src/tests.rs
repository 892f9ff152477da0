use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::StreamExt;
use serde_json::Value;
use skimsim_core::{
    AnalysisError, AnalysisProvider, AnalysisRequest, AnalysisRequester, AnalysisResult,
    AttackScript, AttackState, ProgressionEngine, SimulationController,
};
use tower::ServiceExt;

use crate::config::Config;
use crate::{create_router, AppState};

struct FakeProvider {
    fail: bool,
}

#[async_trait]
impl AnalysisProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        if self.fail {
            return Err(AnalysisError::EmptyResponse);
        }
        Ok(AnalysisResult {
            vulnerability_score: 88.0,
            threat_type: "Relay Skimming".to_string(),
            recommendations: vec!["Enable transaction alerts".to_string()],
            summary: "Card data was captured and replayed.".to_string(),
        })
    }
}

fn app_state(fail: bool) -> AppState {
    let engine = ProgressionEngine::new(AttackScript::standard().with_delay_scale(0.0)).with_seed(5);
    let controller = Arc::new(SimulationController::new(
        engine,
        AnalysisRequester::new(Arc::new(FakeProvider { fail })),
    ));
    let config = Config::from_lookup(|name| (name == "GEMINI_API_KEY").then(|| "test-key".to_string()))
        .unwrap();

    AppState {
        controller,
        config: Arc::new(config),
    }
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn wait_for_completion(state: &AppState) {
    let mut rx = state.controller.subscribe();
    rx.wait_for(|s| s.state == AttackState::Completed && !s.run_in_progress)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_health() {
    let app = create_router(app_state(false));
    let (status, body) = send(&app, Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["stage"], "idle");
    assert_eq!(body["run_in_progress"], false);
    assert_eq!(body["analysis_provider"], "fake");
}

#[tokio::test]
async fn test_health_reports_current_stage() {
    let state = app_state(false);
    let app = create_router(state.clone());

    send(&app, Method::POST, "/api/v1/attack/start").await;
    wait_for_completion(&state).await;

    let (_, body) = send(&app, Method::GET, "/health").await;
    assert_eq!(body["stage"], "completed");
    assert_eq!(body["analysis_in_flight"], false);
}

#[tokio::test]
async fn test_index_serves_html() {
    let app = create_router(app_state(false));
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("EventSource"));
}

#[tokio::test]
async fn test_initial_state() {
    let app = create_router(app_state(false));
    let (status, body) = send(&app, Method::GET, "/api/v1/state").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["logs"].as_array().unwrap().len(), 0);
    assert_eq!(body["analysis"], Value::Null);
    assert_eq!(body["can_start"], true);
    assert_eq!(body["can_analyze"], false);
}

#[tokio::test]
async fn test_start_then_refuse_second_start() {
    let state = app_state(false);
    let app = create_router(state.clone());

    let (status, _) = send(&app, Method::POST, "/api/v1/attack/start").await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = send(&app, Method::POST, "/api/v1/attack/start").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    wait_for_completion(&state).await;

    // Completed is not idle: still refused until reset
    let (status, _) = send(&app, Method::POST, "/api/v1/attack/start").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, logs) = send(&app, Method::GET, "/api/v1/logs").await;
    assert_eq!(logs.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_analyze_without_logs_is_conflict() {
    let app = create_router(app_state(false));
    let (status, body) = send(&app, Method::POST, "/api/v1/analysis").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_analyze_after_run() {
    let state = app_state(false);
    let app = create_router(state.clone());

    send(&app, Method::POST, "/api/v1/attack/start").await;
    wait_for_completion(&state).await;

    let (status, body) = send(&app, Method::POST, "/api/v1/analysis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["vulnerabilityScore"], 88.0);
    assert_eq!(body["result"]["threatType"], "Relay Skimming");
    assert_eq!(body["fallback_reason"], Value::Null);

    let (_, snapshot) = send(&app, Method::GET, "/api/v1/state").await;
    assert_eq!(snapshot["analysis"]["threatType"], "Relay Skimming");
}

#[tokio::test]
async fn test_analysis_failure_returns_fallback_with_ok_status() {
    let state = app_state(true);
    let app = create_router(state.clone());

    send(&app, Method::POST, "/api/v1/attack/start").await;
    wait_for_completion(&state).await;

    let (status, body) = send(&app, Method::POST, "/api/v1/analysis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["vulnerabilityScore"], 0.0);
    assert_eq!(body["result"]["threatType"], "Analysis Failed");
    assert!(body["fallback_reason"].is_string());
}

#[tokio::test]
async fn test_reset_clears_session() {
    let state = app_state(false);
    let app = create_router(state.clone());

    send(&app, Method::POST, "/api/v1/attack/start").await;
    wait_for_completion(&state).await;

    let (status, body) = send(&app, Method::POST, "/api/v1/reset").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["logs"].as_array().unwrap().len(), 0);
    assert_eq!(body["can_start"], true);
}

#[tokio::test]
async fn test_chart_and_accounts() {
    let state = app_state(false);
    let app = create_router(state.clone());

    let (_, chart) = send(&app, Method::GET, "/api/v1/chart").await;
    assert_eq!(chart["points"].as_array().unwrap().len(), 0);

    send(&app, Method::POST, "/api/v1/attack/start").await;
    wait_for_completion(&state).await;

    let (status, chart) = send(&app, Method::GET, "/api/v1/chart").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chart["points"].as_array().unwrap().len(), 6);

    let (status, accounts) = send(&app, Method::GET, "/api/v1/accounts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accounts.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_events_stream_starts_with_snapshot() {
    let app = create_router(app_state(false));
    let response = app
        .oneshot(Request::builder().uri("/api/v1/events").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

    let mut stream = response.into_body().into_data_stream();
    let chunk = stream.next().await.unwrap().unwrap();
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.starts_with("event: snapshot"));
    assert!(text.contains("\"state\":\"idle\""));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = create_router(app_state(false));
    let (status, body) = send(&app, Method::GET, "/api/v1/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}
