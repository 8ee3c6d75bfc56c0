//! Core types for the shameboard server.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A sticky-note task on the board.
///
/// Timestamps are epoch milliseconds (UTC). Booleans are stored as 0/1
/// integers in SQLite and normalized to real booleans when rows are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// Markdown body; may contain `- [ ]` checkbox list items.
    pub content: String,
    /// Canvas position.
    pub x: f64,
    pub y: f64,
    /// Due time in epoch milliseconds. `None` means no deadline.
    pub deadline: Option<i64>,
    /// Message posted on punishment. Blank means "use the process default".
    pub shame_message: String,
    /// Per-task notification target. Blank means "use the process default".
    pub webhook_url: String,
    pub is_completed: bool,
    /// Set once, by the sweep, after a successful notification. Never reset.
    pub is_punished: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    /// True while the task would be selected by the eligibility scan at `now`.
    pub fn is_overdue(&self, now: i64) -> bool {
        !self.is_completed
            && !self.is_punished
            && self.deadline.is_some_and(|deadline| deadline < now)
    }
}

/// Partial update for a task. `None` fields keep their stored value.
///
/// `deadline` is tri-state: absent keeps the stored deadline, `Some(None)`
/// clears it, `Some(Some(ms))` replaces it.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub content: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub is_completed: Option<bool>,
    pub deadline: Option<Option<i64>>,
    pub shame_message: Option<String>,
    pub webhook_url: Option<String>,
}

/// Deadline value as accepted on the wire: epoch milliseconds, an RFC 3339
/// string, or the naive `YYYY-MM-DDTHH:MM[:SS]` form a `datetime-local`
/// input produces (interpreted as UTC).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TimestampInput {
    Millis(i64),
    Text(String),
}

impl TimestampInput {
    /// Normalize to epoch milliseconds UTC.
    pub fn into_millis(self) -> Result<i64> {
        match self {
            Self::Millis(ms) => Ok(ms),
            Self::Text(text) => parse_timestamp(&text),
        }
    }
}

fn parse_timestamp(text: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    Err(anyhow!("unrecognized timestamp: {text}"))
}
