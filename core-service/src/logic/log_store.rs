//! Log Store - append-only session log
//!
//! Entries live in memory for one session and are only ever removed all at
//! once by `clear()`.

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use super::types::{LogEntry, LogLevel};

#[derive(Debug, Default, Clone)]
pub struct LogStore {
    entries: Vec<LogEntry>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new entry and return it.
    ///
    /// Timestamps never go backwards: a clock step earlier than the previous
    /// entry is clamped to the previous timestamp.
    pub fn append(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> &LogEntry {
        let mut timestamp = Utc::now();
        if let Some(last) = self.entries.last() {
            if timestamp < last.timestamp {
                timestamp = last.timestamp;
            }
        }

        self.entries.push(LogEntry {
            id: Uuid::new_v4(),
            timestamp,
            level,
            message: message.into(),
            data,
        });

        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Serialize as `[ISO-timestamp] LEVEL: message`, one line per entry
    pub fn to_transcript(&self) -> String {
        transcript(&self.entries)
    }
}

pub fn transcript(entries: &[LogEntry]) -> String {
    entries
        .iter()
        .map(transcript_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn transcript_line(entry: &LogEntry) -> String {
    format!(
        "[{}] {}: {}",
        entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        entry.level.label(),
        entry.message
    )
}
