//! Skim Simulator Dashboard Server
//!
//! Serves the single-page attack simulation dashboard and its JSON/SSE API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SKIM SIMULATOR                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │ Dashboard │  │  Command API     │  │  Snapshot SSE   │  │
//! │  │ (HTML/JS) │  │  start/analyze/  │  │  /api/v1/events │  │
//! │  │           │  │  reset (Axum)    │  │                 │  │
//! │  └─────┬─────┘  └────────┬─────────┘  └────────┬────────┘  │
//! │        └─────────────────┼──────────────────────┘           │
//! │                          ▼                                  │
//! │                ┌─────────────────────┐    ┌──────────────┐  │
//! │                │ SimulationController│───▶│ Gemini API   │  │
//! │                └─────────────────────┘    └──────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use skimsim_core::{
    AnalysisRequester, AttackScript, GeminiProvider, ProgressionEngine, SimulationController,
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();
    let config = config::Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.is_production());

    tracing::info!("Skim Simulator Dashboard starting ({})...", config.environment);
    tracing::info!("Analysis model: {} ({})", config.gemini.model, config.gemini.base_url);
    if config.delay_scale != 1.0 {
        tracing::info!("Scripted delays scaled by {}", config.delay_scale);
    }

    let provider = GeminiProvider::new(config.gemini.clone())
        .context("Failed to create analysis client")?;
    let engine = ProgressionEngine::new(AttackScript::standard().with_delay_scale(config.delay_scale));
    let controller = Arc::new(SimulationController::new(
        engine,
        AnalysisRequester::new(Arc::new(provider)),
    ));

    // Build application state
    let state = AppState {
        controller,
        config: Arc::new(config),
    };

    // Build router
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = create_router(state);

    // Start server
    tracing::info!("🚀 Dashboard listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Dashboard stopped");
    Ok(())
}

/// Plain text in development, JSON lines in production
fn init_tracing(production: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skimsim_dashboard=debug,skimsim_core=info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if production {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SimulationController>,
    pub config: Arc<config::Config>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Page + health
    let public_routes = Router::new()
        .route("/", get(handlers::dashboard::index))
        .route("/health", get(handlers::health::check));

    // Read-only session views
    let view_routes = Router::new()
        .route("/api/v1/state", get(handlers::session::snapshot))
        .route("/api/v1/logs", get(handlers::session::logs))
        .route("/api/v1/chart", get(handlers::session::chart))
        .route("/api/v1/accounts", get(handlers::session::accounts))
        .route("/api/v1/events", get(handlers::session::events));

    // Commands
    let command_routes = Router::new()
        .route("/api/v1/attack/start", post(handlers::attack::start))
        .route("/api/v1/reset", post(handlers::attack::reset))
        .route("/api/v1/analysis", post(handlers::analysis::analyze));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(view_routes)
        .merge(command_routes)
        .fallback(handlers::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
