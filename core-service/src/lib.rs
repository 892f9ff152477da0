//! Skim Simulator Core
//!
//! Scripted card-skimming attack simulation with an in-memory session log and
//! an AI-generated vulnerability report.
//!
//! ```text
//! user command ──▶ SimulationController ──▶ ProgressionEngine (timed steps)
//!                        │   ▲                      │
//!                        │   └──── append / set_state
//!                        ▼
//!                  AnalysisRequester ──▶ AnalysisProvider (Gemini)
//!                        │
//!                        ▼
//!                  watch::Receiver<Snapshot>  (presentation, read-only)
//! ```

pub mod constants;
pub mod logic;

pub use logic::accounts::{seed_accounts, Account};
pub use logic::ai_bridge::{
    AnalysisError, AnalysisOutcome, AnalysisProvider, AnalysisRequest, AnalysisRequester,
    GeminiConfig, GeminiProvider,
};
pub use logic::chart::{ChartPoint, ChartSeries};
pub use logic::controller::{CommandError, SimulationController, Snapshot};
pub use logic::log_store::LogStore;
pub use logic::progression::{AttackScript, AttackStep, ProgressionEngine, RunOutcome, ScriptedLog};
pub use logic::types::{AnalysisResult, AttackState, LogEntry, LogLevel};
