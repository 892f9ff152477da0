//! Simulation Controller - single owner of session state
//!
//! Session state (current stage, log, report, selected amount) lives in one
//! struct behind one mutex. Its only mutators are `append`, `reset`,
//! `set_state` and `set_analysis`; every mutation publishes a [`Snapshot`]
//! on a watch channel that the presentation layer reads.
//!
//! The mutex is never held across an `.await`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use super::ai_bridge::{AnalysisOutcome, AnalysisRequester};
use super::log_store::LogStore;
use super::progression::{Aborted, ProgressionEngine, ProgressionSink, RenderedLog, RunOutcome};
use super::types::{AnalysisResult, AttackState, LogEntry, LogLevel};


// ============================================================================
// ERRORS
// ============================================================================

/// Commands refused without touching session state
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    #[error("Simulation can only start from the idle state (current: {0})")]
    NotIdle(AttackState),

    #[error("A simulation run is already in progress")]
    RunInProgress,

    #[error("No log entries to analyze")]
    NoLogs,

    #[error("An analysis request is already in flight")]
    AnalysisInFlight,

    #[error("Session was reset while the analysis was in flight; result discarded")]
    Discarded,
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Default)]
struct SessionState {
    state: AttackState,
    logs: LogStore,
    analysis: Option<AnalysisResult>,
    selected_amount: u32,
    run_in_progress: bool,
    analysis_in_flight: bool,
    /// Bumped by every reset; stale runs and requests compare against it
    epoch: u64,
    revision: u64,
}

impl SessionState {
    fn append(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> &LogEntry {
        self.logs.append(level, message, data)
    }

    fn set_state(&mut self, state: AttackState) {
        self.state = state;
    }

    fn set_analysis(&mut self, analysis: Option<AnalysisResult>) {
        self.analysis = analysis;
    }

    fn reset(&mut self) {
        self.state = AttackState::Idle;
        self.logs.clear();
        self.analysis = None;
        self.selected_amount = 0;
        self.run_in_progress = false;
        // An outstanding request keeps its claim until it settles
        self.epoch += 1;
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            revision: self.revision,
            state: self.state,
            logs: self.logs.entries().to_vec(),
            analysis: self.analysis.clone(),
            selected_amount: self.selected_amount,
            run_in_progress: self.run_in_progress,
            analysis_in_flight: self.analysis_in_flight,
            can_start: self.state == AttackState::Idle && !self.run_in_progress,
            can_analyze: !self.logs.is_empty() && !self.analysis_in_flight,
            can_reset: true,
        }
    }
}

/// Read-only view of the session handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub revision: u64,
    pub state: AttackState,
    pub logs: Vec<LogEntry>,
    pub analysis: Option<AnalysisResult>,
    pub selected_amount: u32,
    pub run_in_progress: bool,
    pub analysis_in_flight: bool,
    pub can_start: bool,
    pub can_analyze: bool,
    pub can_reset: bool,
}

// ============================================================================
// CONTROLLER
// ============================================================================

pub struct SimulationController {
    session: Mutex<SessionState>,
    engine: ProgressionEngine,
    requester: AnalysisRequester,
    updates: watch::Sender<Snapshot>,
    abort: Notify,
}

impl SimulationController {
    pub fn new(engine: ProgressionEngine, requester: AnalysisRequester) -> Self {
        let session = SessionState::default();
        let (updates, _) = watch::channel(session.snapshot());

        Self {
            session: Mutex::new(session),
            engine,
            requester,
            updates,
            abort: Notify::new(),
        }
    }

    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    /// Name of the backend answering analysis requests
    pub fn analysis_provider(&self) -> &str {
        self.requester.provider_name()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session.lock().snapshot()
    }

    /// Subscribe to snapshots; the receiver starts at the current one
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.updates.subscribe()
    }

    pub fn state(&self) -> AttackState {
        self.session.lock().state
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.session.lock().logs.entries().to_vec()
    }

    pub fn analysis(&self) -> Option<AnalysisResult> {
        self.session.lock().analysis.clone()
    }

    fn publish(&self, session: &mut SessionState) {
        session.revision += 1;
        self.updates.send_replace(session.snapshot());
    }

    // ------------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------------

    /// Append a narration line outside of a scripted run
    pub fn append(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> LogEntry {
        let mut session = self.session.lock();
        let entry = session.append(level, message, data).clone();
        self.publish(&mut session);
        entry
    }

    /// Back to idle with an empty log, no report and no amount. Cancels any
    /// run or request still outstanding.
    pub fn reset(&self) {
        let mut session = self.session.lock();
        let was_running = session.run_in_progress;
        session.reset();
        self.publish(&mut session);
        drop(session);

        self.abort.notify_waiters();
        if was_running {
            log::info!("Session reset, in-progress run cancelled");
        } else {
            log::info!("Session reset");
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Claim the session for a new run. Returns the epoch the run belongs to.
    fn begin_run(&self) -> Result<u64, CommandError> {
        let mut session = self.session.lock();
        if session.run_in_progress {
            return Err(CommandError::RunInProgress);
        }
        if session.state != AttackState::Idle {
            return Err(CommandError::NotIdle(session.state));
        }

        session.run_in_progress = true;
        let epoch = session.epoch;
        self.publish(&mut session);
        log::info!("Attack simulation started");
        Ok(epoch)
    }

    /// Run the scripted attack to completion (or until reset)
    pub async fn run(&self) -> Result<RunOutcome, CommandError> {
        let epoch = self.begin_run()?;
        Ok(self.drive(epoch).await)
    }

    /// Start the run on the runtime and return immediately
    pub fn spawn_run(self: &Arc<Self>) -> Result<JoinHandle<RunOutcome>, CommandError> {
        let epoch = self.begin_run()?;
        let controller = Arc::clone(self);
        Ok(tokio::spawn(async move { controller.drive(epoch).await }))
    }

    async fn drive(&self, epoch: u64) -> RunOutcome {
        let sink = RunSink { controller: self, epoch };
        let outcome = self.engine.run(&sink).await;

        let mut session = self.session.lock();
        if session.epoch == epoch {
            session.run_in_progress = false;
            self.publish(&mut session);
        }
        outcome
    }

    /// Request one vulnerability report for the current log.
    ///
    /// At most one request is in flight, across resets too. A failed request
    /// stores the fallback record and appends an error entry. A reset while
    /// the request is outstanding discards its result and the call returns
    /// [`CommandError::Discarded`].
    pub async fn analyze(&self) -> Result<AnalysisOutcome, CommandError> {
        let (logs, epoch) = {
            let mut session = self.session.lock();
            if session.analysis_in_flight {
                return Err(CommandError::AnalysisInFlight);
            }
            if session.logs.is_empty() {
                return Err(CommandError::NoLogs);
            }
            session.analysis_in_flight = true;
            let claimed = (session.logs.entries().to_vec(), session.epoch);
            self.publish(&mut session);
            claimed
        };

        log::info!(
            "Analyzing {} log entries via {}",
            logs.len(),
            self.requester.provider_name()
        );
        let outcome = self.requester.analyze(&logs).await;

        let mut session = self.session.lock();
        session.analysis_in_flight = false;
        if session.epoch != epoch {
            log::info!("Discarding analysis result for a session that was reset");
            self.publish(&mut session);
            return Err(CommandError::Discarded);
        }

        let Some(outcome) = outcome else {
            self.publish(&mut session);
            return Err(CommandError::NoLogs);
        };

        session.set_analysis(Some(outcome.result.clone()));
        if let Some(reason) = &outcome.fallback_reason {
            session.append(
                LogLevel::Error,
                format!("AI analysis failed: {}", reason),
                None,
            );
        }
        self.publish(&mut session);

        Ok(outcome)
    }
}

// ============================================================================
// RUN SINK
// ============================================================================

/// Applies engine mutations for one run, refusing them once the session has
/// been reset past `epoch`.
struct RunSink<'a> {
    controller: &'a SimulationController,
    epoch: u64,
}

impl RunSink<'_> {
    fn is_current(&self) -> bool {
        self.controller.session.lock().epoch == self.epoch
    }
}

#[async_trait]
impl<'a> ProgressionSink for RunSink<'a> {
    fn enter_stage(
        &self,
        state: AttackState,
        amount: Option<u32>,
        logs: Vec<RenderedLog>,
    ) -> Result<(), Aborted> {
        let mut session = self.controller.session.lock();
        if session.epoch != self.epoch {
            return Err(Aborted);
        }

        session.set_state(state);
        if let Some(amount) = amount {
            session.selected_amount = amount;
        }
        for log in logs {
            session.append(log.level, log.message, log.data);
        }
        self.controller.publish(&mut session);
        Ok(())
    }

    async fn pause(&self, delay: Duration) -> Result<(), Aborted> {
        // Created before the check so a reset in between still wakes us
        let notified = self.controller.abort.notified();
        tokio::pin!(notified);

        if !self.is_current() {
            return Err(Aborted);
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut notified => {}
        }

        if self.is_current() {
            Ok(())
        } else {
            Err(Aborted)
        }
    }
}
