use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{FALLBACK_RECOMMENDATIONS, FALLBACK_SUMMARY, FALLBACK_THREAT_TYPE};

/// Stage of the simulated skimming attack.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AttackState {
    #[default]
    Idle,
    Scanning,
    CardDetected,
    PinBypass,
    AmountSelection,
    TransactionProcessing,
    Completed,
    Failed, // never reached by the standard script
}

impl AttackState {
    pub const ALL: [AttackState; 8] = [
        AttackState::Idle,
        AttackState::Scanning,
        AttackState::CardDetected,
        AttackState::PinBypass,
        AttackState::AmountSelection,
        AttackState::TransactionProcessing,
        AttackState::Completed,
        AttackState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttackState::Idle => "idle",
            AttackState::Scanning => "scanning",
            AttackState::CardDetected => "card-detected",
            AttackState::PinBypass => "pin-bypass",
            AttackState::AmountSelection => "amount-selection",
            AttackState::TransactionProcessing => "transaction-processing",
            AttackState::Completed => "completed",
            AttackState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AttackState::Completed | AttackState::Failed)
    }
}

impl std::fmt::Display for AttackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl LogLevel {
    /// Upper-case label used in the serialized transcript
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Success => "SUCCESS",
        }
    }
}

/// One line of simulation narration. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Vulnerability report returned by the analysis service.
///
/// Field names match the required output schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub vulnerability_score: f64, // 0 - 100
    pub threat_type: String,
    pub recommendations: Vec<String>,
    pub summary: String,
}

impl AnalysisResult {
    /// Fixed record used whenever the analysis call fails
    pub fn fallback() -> Self {
        Self {
            vulnerability_score: 0.0,
            threat_type: FALLBACK_THREAT_TYPE.to_string(),
            recommendations: FALLBACK_RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
            summary: FALLBACK_SUMMARY.to_string(),
        }
    }

    pub fn score_in_range(&self) -> bool {
        self.vulnerability_score.is_finite() && (0.0..=100.0).contains(&self.vulnerability_score)
    }
}
