//! Transcript entries and backend capability flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{AiInterpretation, HealthResponse};
use crate::executor::Executor;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemStatus {
    pub gemini_available: bool,
    pub mini_bash_available: bool,
}

impl From<&HealthResponse> for SystemStatus {
    fn from(health: &HealthResponse) -> Self {
        Self {
            gemini_available: health.gemini_available,
            mini_bash_available: health.mini_bash_available,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Input,
    Output,
    Error,
}

/// One line of the transcript. Entries are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEntry {
    Input {
        content: String,
        is_voice: bool,
        directory: String,
        preferred_executor: Executor,
        timestamp: DateTime<Utc>,
    },
    Output {
        content: String,
        success: bool,
        command: Option<String>,
        ai_interpretation: Option<AiInterpretation>,
        executor: Option<String>,
        directory: Option<String>,
        timestamp: DateTime<Utc>,
    },
    Error {
        content: String,
        timestamp: DateTime<Utc>,
    },
}

impl HistoryEntry {
    pub fn kind(&self) -> HistoryKind {
        match self {
            HistoryEntry::Input { .. } => HistoryKind::Input,
            HistoryEntry::Output { .. } => HistoryKind::Output,
            HistoryEntry::Error { .. } => HistoryKind::Error,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            HistoryEntry::Input { content, .. }
            | HistoryEntry::Output { content, .. }
            | HistoryEntry::Error { content, .. } => content,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            HistoryEntry::Input { timestamp, .. }
            | HistoryEntry::Output { timestamp, .. }
            | HistoryEntry::Error { timestamp, .. } => *timestamp,
        }
    }

    /// Error entries always report failure; input entries have no outcome.
    pub fn success(&self) -> Option<bool> {
        match self {
            HistoryEntry::Input { .. } => None,
            HistoryEntry::Output { success, .. } => Some(*success),
            HistoryEntry::Error { .. } => Some(false),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, HistoryEntry::Input { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_serialize_with_type_tag() {
        let entry = HistoryEntry::Error {
            content: "Failed to execute command".into(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(entry.success(), Some(false));
        assert!(entry.is_terminal());
    }

    #[test]
    fn input_entry_is_not_terminal() {
        let entry = HistoryEntry::Input {
            content: "list files".into(),
            is_voice: true,
            directory: "~".into(),
            preferred_executor: Executor::MiniBash,
            timestamp: Utc::now(),
        };
        assert_eq!(entry.kind(), HistoryKind::Input);
        assert_eq!(entry.success(), None);
        assert!(!entry.is_terminal());
    }
}
