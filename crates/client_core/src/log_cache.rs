//! Last received log text per agent.
//!
//! Responses carry no request id, so the newest response for an agent
//! simply overwrites whatever was cached before.

use std::collections::{hash_map::Entry, HashMap};

use chrono::{DateTime, Utc};
use shared::domain::AgentId;

pub const LOADING_TEXT: &str = "Loading logs...";
const NO_LOGS_RETURNED: &str = "no logs returned";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    Text {
        text: String,
        received_at: DateTime<Utc>,
    },
    Failed {
        reason: String,
        received_at: DateTime<Utc>,
    },
}

impl LogEntry {
    pub fn received_at(&self) -> DateTime<Utc> {
        match self {
            Self::Text { received_at, .. } | Self::Failed { received_at, .. } => *received_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogView<'a> {
    Loading,
    Text(&'a str),
    Failed(&'a str),
}

impl<'a> LogView<'a> {
    pub fn display_text(&self) -> &'a str {
        match self {
            Self::Loading => LOADING_TEXT,
            Self::Text(text) => text,
            Self::Failed(reason) => reason,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Debug, Default, Clone)]
pub struct LogCache {
    entries: HashMap<AgentId, LogEntry>,
}

impl LogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a `logs` response. `success: false` or a null body is recorded
    /// as a failed fetch.
    pub fn record(
        &mut self,
        container_id: AgentId,
        success: Option<bool>,
        logs: Option<String>,
    ) -> &LogEntry {
        let received_at = Utc::now();
        let entry = match (success, logs) {
            (Some(false), logs) => LogEntry::Failed {
                reason: logs.unwrap_or_else(|| NO_LOGS_RETURNED.to_string()),
                received_at,
            },
            (_, None) => LogEntry::Failed {
                reason: NO_LOGS_RETURNED.to_string(),
                received_at,
            },
            (_, Some(text)) => LogEntry::Text { text, received_at },
        };
        match self.entries.entry(container_id) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(entry);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(entry),
        }
    }

    pub fn get(&self, id: &AgentId) -> Option<&LogEntry> {
        self.entries.get(id)
    }

    pub fn view(&self, id: &AgentId) -> LogView<'_> {
        match self.entries.get(id) {
            None => LogView::Loading,
            Some(LogEntry::Text { text, .. }) => LogView::Text(text),
            Some(LogEntry::Failed { reason, .. }) => LogView::Failed(reason),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/log_cache_tests.rs"]
mod tests;
