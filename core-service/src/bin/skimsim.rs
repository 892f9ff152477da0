//! Skim Simulator - headless console runner
//!
//! Plays the standard attack script in the terminal, then asks for a
//! vulnerability report when `GEMINI_API_KEY` is set.
//!
//! Usage: `skimsim [--fast]`

use std::sync::Arc;

use chrono::SecondsFormat;
use skimsim_core::constants;
use skimsim_core::{
    AnalysisRequester, AttackScript, GeminiConfig, GeminiProvider, ProgressionEngine, RunOutcome,
    SimulationController,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let fast = std::env::args().skip(1).any(|arg| arg == "--fast");
    let script = if fast {
        AttackScript::standard().with_delay_scale(0.0)
    } else {
        AttackScript::standard()
    };

    log::info!("Starting {} v{} (console)", constants::APP_NAME, constants::APP_VERSION);

    let config = GeminiConfig::default();
    let has_key = !config.api_key.is_empty();
    let provider = match GeminiProvider::new(config) {
        Ok(provider) => provider,
        Err(e) => {
            log::error!("Failed to create analysis client: {}", e);
            std::process::exit(1);
        }
    };

    let controller = Arc::new(SimulationController::new(
        ProgressionEngine::new(script),
        AnalysisRequester::new(Arc::new(provider)),
    ));

    // Stream log lines as they are appended
    let mut updates = controller.subscribe();
    let printer = tokio::spawn(async move {
        let mut printed = 0usize;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            for entry in snapshot.logs.iter().skip(printed) {
                println!(
                    "[{}] {:<7} {:<22} {}",
                    entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                    entry.level.label(),
                    snapshot.state.as_str(),
                    entry.message
                );
            }
            printed = snapshot.logs.len();
        }
    });

    let outcome = match controller.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("Simulation refused: {}", e);
            std::process::exit(1);
        }
    };

    let report = match outcome {
        RunOutcome::Completed { .. } if has_key => match controller.analyze().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::warn!("Analysis skipped: {}", e);
                None
            }
        },
        RunOutcome::Completed { .. } => {
            log::warn!("GEMINI_API_KEY not set - skipping vulnerability analysis");
            None
        }
        RunOutcome::Aborted => None,
    };

    // Closing the channel lets the printer drain and exit
    drop(controller);
    printer.await.ok();

    if let Some(outcome) = report {
        let result = outcome.result;
        println!();
        println!("=== Vulnerability Report ===");
        println!("Score:       {:.0}/100", result.vulnerability_score);
        println!("Threat type: {}", result.threat_type);
        println!("Summary:     {}", result.summary);
        println!("Recommendations:");
        for (i, rec) in result.recommendations.iter().enumerate() {
            println!("  {}. {}", i + 1, rec);
        }
    }
}
