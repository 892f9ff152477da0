//! Chart series derived from the session log

use serde::Serialize;

use super::types::{LogEntry, LogLevel};

/// Threat intensity plotted per entry
pub fn intensity(level: LogLevel) -> u8 {
    match level {
        LogLevel::Info => 10,
        LogLevel::Success => 25,
        LogLevel::Warning => 60,
        LogLevel::Error => 90,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LevelBreakdown {
    pub info: usize,
    pub warning: usize,
    pub error: usize,
    pub success: usize,
}

impl LevelBreakdown {
    fn record(&mut self, level: LogLevel) {
        match level {
            LogLevel::Info => self.info += 1,
            LogLevel::Warning => self.warning += 1,
            LogLevel::Error => self.error += 1,
            LogLevel::Success => self.success += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.info + self.warning + self.error + self.success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Seconds since the first entry
    pub elapsed_secs: f64,
    pub cumulative: usize,
    pub intensity: u8,
    pub counts: LevelBreakdown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub points: Vec<ChartPoint>,
    pub breakdown: LevelBreakdown,
}

impl ChartSeries {
    pub fn from_logs(entries: &[LogEntry]) -> Self {
        let Some(first) = entries.first() else {
            return Self::default();
        };

        let mut counts = LevelBreakdown::default();
        let points = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                counts.record(entry.level);
                let elapsed = entry.timestamp.signed_duration_since(first.timestamp);
                ChartPoint {
                    elapsed_secs: elapsed.num_milliseconds() as f64 / 1000.0,
                    cumulative: i + 1,
                    intensity: intensity(entry.level),
                    counts: counts.clone(),
                }
            })
            .collect();

        Self { points, breakdown: counts }
    }

    pub fn peak_intensity(&self) -> u8 {
        self.points.iter().map(|p| p.intensity).max().unwrap_or(0)
    }
}
