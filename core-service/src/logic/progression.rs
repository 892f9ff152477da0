//! Progression Engine - scripted attack sequence
//!
//! The attack is an explicit ordered list of step descriptors. A driver loop
//! walks it strictly in order: set the stage, emit the stage's log lines, then
//! pause for the step's delay. The engine owns no session state; every
//! mutation goes through a [`ProgressionSink`], which may abort the run.

use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use super::types::{AttackState, LogLevel};
use crate::constants::AMOUNT_RANGE;

/// Placeholder substituted with the selected amount
pub const AMOUNT_PLACEHOLDER: &str = "{amount}";

// ============================================================================
// SCRIPT
// ============================================================================

/// Log line template emitted by a step
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedLog {
    pub level: LogLevel,
    pub template: String,
    pub data: Option<Value>,
}

impl ScriptedLog {
    pub fn new(level: LogLevel, template: impl Into<String>) -> Self {
        Self {
            level,
            template: template.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Substitute the amount placeholder in the message and data.
    ///
    /// A data value that is exactly the placeholder becomes a JSON number.
    pub fn render(&self, amount: u32) -> RenderedLog {
        RenderedLog {
            level: self.level,
            message: self.template.replace(AMOUNT_PLACEHOLDER, &amount.to_string()),
            data: self.data.as_ref().map(|d| interpolate(d, amount)),
        }
    }
}

fn interpolate(value: &Value, amount: u32) -> Value {
    match value {
        Value::String(s) if s == AMOUNT_PLACEHOLDER => json!(amount),
        Value::String(s) => Value::String(s.replace(AMOUNT_PLACEHOLDER, &amount.to_string())),
        Value::Array(items) => Value::Array(items.iter().map(|v| interpolate(v, amount)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate(v, amount)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Log line ready to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLog {
    pub level: LogLevel,
    pub message: String,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttackStep {
    pub target_state: AttackState,
    pub logs: Vec<ScriptedLog>,
    pub delay: Duration,
}

impl AttackStep {
    pub fn new(target_state: AttackState, delay_ms: u64) -> Self {
        Self {
            target_state,
            logs: Vec::new(),
            delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn log(mut self, log: ScriptedLog) -> Self {
        self.logs.push(log);
        self
    }

    /// The amount is drawn when this step runs
    pub fn selects_amount(&self) -> bool {
        self.target_state == AttackState::AmountSelection
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttackScript {
    steps: Vec<AttackStep>,
}

impl AttackScript {
    pub fn new(steps: Vec<AttackStep>) -> Self {
        Self { steps }
    }

    /// The fixed skimming sequence shown on the dashboard
    pub fn standard() -> Self {
        Self::new(vec![
            AttackStep::new(AttackState::Scanning, 2000).log(ScriptedLog::new(
                LogLevel::Info,
                "Initializing NFC reader... scanning for contactless cards",
            )),
            AttackStep::new(AttackState::CardDetected, 1500).log(
                ScriptedLog::new(
                    LogLevel::Success,
                    "Card detected: EMV contactless card in range",
                )
                .with_data(json!({
                    "uid": "04:A2:3B:9C:1F:6E:80",
                    "cardType": "Visa Debit",
                    "protocol": "ISO 14443-A",
                })),
            ),
            AttackStep::new(AttackState::PinBypass, 2000).log(ScriptedLog::new(
                LogLevel::Warning,
                "Attempting PIN verification bypass via relay replay",
            )),
            AttackStep::new(AttackState::AmountSelection, 1500).log(
                ScriptedLog::new(LogLevel::Info, "Selected withdrawal amount: ${amount}")
                    .with_data(json!({ "amount": AMOUNT_PLACEHOLDER })),
            ),
            AttackStep::new(AttackState::TransactionProcessing, 2500).log(ScriptedLog::new(
                LogLevel::Info,
                "Processing unauthorized transaction...",
            )),
            AttackStep::new(AttackState::Completed, 0).log(ScriptedLog::new(
                LogLevel::Success,
                "Attack simulation complete: ${amount} withdrawn",
            )),
        ])
    }

    /// Same script with every delay multiplied by `factor` (0.0 = no pauses).
    /// Products too large for a `Duration` saturate at `Duration::MAX`.
    pub fn with_delay_scale(mut self, factor: f64) -> Self {
        let factor = if factor.is_finite() { factor.max(0.0) } else { 1.0 };
        for step in &mut self.steps {
            step.delay = Duration::try_from_secs_f64(step.delay.as_secs_f64() * factor)
                .unwrap_or(Duration::MAX);
        }
        self
    }

    pub fn steps(&self) -> &[AttackStep] {
        &self.steps
    }

    /// Number of log entries a complete run appends
    pub fn log_count(&self) -> usize {
        self.steps.iter().map(|s| s.logs.len()).sum()
    }

    pub fn total_delay(&self) -> Duration {
        self.steps
            .iter()
            .fold(Duration::ZERO, |total, s| total.saturating_add(s.delay))
    }
}

impl Default for AttackScript {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// DRIVER
// ============================================================================

/// The run was cancelled by a reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;

/// Receiver of the engine's mutations
#[async_trait]
pub trait ProgressionSink: Send + Sync {
    /// Set the stage and append its logs as one atomic update
    fn enter_stage(
        &self,
        state: AttackState,
        amount: Option<u32>,
        logs: Vec<RenderedLog>,
    ) -> Result<(), Aborted>;

    /// Suspend between steps
    async fn pause(&self, delay: Duration) -> Result<(), Aborted>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed { amount: u32, entries: usize },
    Aborted,
}

pub struct ProgressionEngine {
    script: AttackScript,
    amount_range: RangeInclusive<u32>,
    rng: Mutex<StdRng>,
}

impl ProgressionEngine {
    pub fn new(script: AttackScript) -> Self {
        Self {
            script,
            amount_range: AMOUNT_RANGE,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic amount selection
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_amount_range(mut self, range: RangeInclusive<u32>) -> Self {
        self.amount_range = range;
        self
    }

    pub fn script(&self) -> &AttackScript {
        &self.script
    }

    pub fn amount_range(&self) -> &RangeInclusive<u32> {
        &self.amount_range
    }

    fn pick_amount(&self) -> u32 {
        if self.amount_range.is_empty() {
            return *self.amount_range.start();
        }
        self.rng.lock().gen_range(self.amount_range.clone())
    }

    /// Walk the script in order. Returns early with `Aborted` as soon as the
    /// sink refuses a mutation or a pause.
    pub async fn run<S: ProgressionSink + ?Sized>(&self, sink: &S) -> RunOutcome {
        let mut amount: Option<u32> = None;
        let mut entries = 0usize;

        for step in self.script.steps() {
            if step.selects_amount() && amount.is_none() {
                amount = Some(self.pick_amount());
            }

            let rendered: Vec<RenderedLog> = step
                .logs
                .iter()
                .map(|log| log.render(amount.unwrap_or(0)))
                .collect();
            let emitted = rendered.len();

            if sink.enter_stage(step.target_state, amount, rendered).is_err() {
                log::info!("Attack run aborted before stage '{}'", step.target_state);
                return RunOutcome::Aborted;
            }
            entries += emitted;
            log::debug!("Stage '{}' entered ({} log lines)", step.target_state, emitted);

            if !step.delay.is_zero() && sink.pause(step.delay).await.is_err() {
                log::info!("Attack run aborted during stage '{}'", step.target_state);
                return RunOutcome::Aborted;
            }
        }

        let amount = amount.unwrap_or(0);
        log::info!("Attack run completed: {} entries, amount ${}", entries, amount);
        RunOutcome::Completed { amount, entries }
    }
}

impl Default for ProgressionEngine {
    fn default() -> Self {
        Self::new(AttackScript::standard())
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        stages: Mutex<Vec<(AttackState, Option<u32>, Vec<RenderedLog>)>>,
        pauses: Mutex<Vec<Duration>>,
        abort_at_stage: Option<usize>,
        abort_at_pause: Option<usize>,
    }

    #[async_trait]
    impl ProgressionSink for RecordingSink {
        fn enter_stage(
            &self,
            state: AttackState,
            amount: Option<u32>,
            logs: Vec<RenderedLog>,
        ) -> Result<(), Aborted> {
            let mut stages = self.stages.lock();
            if self.abort_at_stage == Some(stages.len()) {
                return Err(Aborted);
            }
            stages.push((state, amount, logs));
            Ok(())
        }

        async fn pause(&self, delay: Duration) -> Result<(), Aborted> {
            let mut pauses = self.pauses.lock();
            if self.abort_at_pause == Some(pauses.len()) {
                return Err(Aborted);
            }
            pauses.push(delay);
            Ok(())
        }
    }

    #[test]
    fn test_standard_script_shape() {
        let script = AttackScript::standard();
        let states: Vec<AttackState> = script.steps().iter().map(|s| s.target_state).collect();

        assert_eq!(
            states,
            vec![
                AttackState::Scanning,
                AttackState::CardDetected,
                AttackState::PinBypass,
                AttackState::AmountSelection,
                AttackState::TransactionProcessing,
                AttackState::Completed,
            ]
        );
        assert_eq!(script.log_count(), 6);
        assert_eq!(script.total_delay(), Duration::from_millis(9500));
        assert!(!states.contains(&AttackState::Failed));
    }

    #[test]
    fn test_render_substitutes_amount() {
        let log = ScriptedLog::new(LogLevel::Info, "Selected ${amount}")
            .with_data(json!({ "amount": AMOUNT_PLACEHOLDER, "note": "took ${amount}" }));

        let rendered = log.render(250);
        assert_eq!(rendered.message, "Selected $250");
        assert_eq!(rendered.data, Some(json!({ "amount": 250, "note": "took $250" })));
    }

    #[test]
    fn test_delay_scale() {
        let script = AttackScript::standard().with_delay_scale(0.0);
        assert_eq!(script.total_delay(), Duration::ZERO);

        let half = AttackScript::standard().with_delay_scale(0.5);
        assert_eq!(half.steps()[0].delay, Duration::from_millis(1000));
    }

    #[test]
    fn test_huge_delay_scale_saturates() {
        let script = AttackScript::standard().with_delay_scale(1e300);

        assert_eq!(script.steps()[0].delay, Duration::MAX);
        // Final step has no delay to scale
        assert_eq!(script.steps()[5].delay, Duration::ZERO);
        assert_eq!(script.total_delay(), Duration::MAX);
    }

    #[tokio::test]
    async fn test_run_walks_script_in_order() {
        let engine = ProgressionEngine::default().with_seed(7);
        let sink = RecordingSink::default();

        let outcome = engine.run(&sink).await;

        let stages = sink.stages.lock();
        let states: Vec<AttackState> = stages.iter().map(|(s, _, _)| *s).collect();
        let expected: Vec<AttackState> =
            engine.script().steps().iter().map(|s| s.target_state).collect();
        assert_eq!(states, expected);

        // Completed step has no delay, so one fewer pause than stages
        let pauses = sink.pauses.lock();
        assert_eq!(pauses.len(), stages.len() - 1);
        assert_eq!(pauses[0], Duration::from_millis(2000));

        match outcome {
            RunOutcome::Completed { amount, entries } => {
                assert_eq!(entries, 6);
                assert!(AMOUNT_RANGE.contains(&amount));
            }
            RunOutcome::Aborted => panic!("Expected completed run"),
        }
    }

    #[tokio::test]
    async fn test_amount_selected_once_and_reused() {
        let engine = ProgressionEngine::default().with_seed(42);
        let sink = RecordingSink::default();

        let outcome = engine.run(&sink).await;
        let RunOutcome::Completed { amount, .. } = outcome else {
            panic!("Expected completed run");
        };

        let stages = sink.stages.lock();
        // No amount before the selection stage
        assert!(stages[..3].iter().all(|(_, a, _)| a.is_none()));

        let (_, selected, logs) = &stages[3];
        assert_eq!(*selected, Some(amount));
        assert_eq!(logs[0].data, Some(json!({ "amount": amount })));

        let (_, _, final_logs) = stages.last().unwrap();
        assert!(final_logs[0].message.contains(&amount.to_string()));
    }

    #[tokio::test]
    async fn test_seeded_runs_are_deterministic() {
        let a = ProgressionEngine::default().with_seed(99).run(&RecordingSink::default()).await;
        let b = ProgressionEngine::default().with_seed(99).run(&RecordingSink::default()).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_fixed_amount_range() {
        let engine = ProgressionEngine::default().with_amount_range(300..=300);
        let outcome = engine.run(&RecordingSink::default()).await;
        assert_eq!(outcome, RunOutcome::Completed { amount: 300, entries: 6 });
    }

    #[tokio::test]
    async fn test_abort_on_stage_stops_run() {
        let engine = ProgressionEngine::default();
        let sink = RecordingSink {
            abort_at_stage: Some(2),
            ..Default::default()
        };

        assert_eq!(engine.run(&sink).await, RunOutcome::Aborted);
        assert_eq!(sink.stages.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_abort_on_pause_stops_run() {
        let engine = ProgressionEngine::default();
        let sink = RecordingSink {
            abort_at_pause: Some(0),
            ..Default::default()
        };

        assert_eq!(engine.run(&sink).await, RunOutcome::Aborted);
        assert_eq!(sink.stages.lock().len(), 1);
    }
}
