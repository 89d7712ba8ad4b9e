//! Operator console: an in-memory, append-only message log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Info,
    Warning,
    Error,
    Command,
    Response,
}

impl MessageKind {
    pub fn badge(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERR",
            Self::Command => "CMD",
            Self::Response => "RESP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub id: u64,
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConsoleMessage {
    /// `HH:MM:SS [BADGE] content`
    pub fn render(&self) -> String {
        format!(
            "{} [{}] {}",
            self.timestamp.format("%H:%M:%S"),
            self.kind.badge(),
            self.content
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct Console {
    entries: Vec<ConsoleMessage>,
    next_id: u64,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: MessageKind, content: impl Into<String>) -> &ConsoleMessage {
        self.next_id += 1;
        self.entries.push(ConsoleMessage {
            id: self.next_id,
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[ConsoleMessage] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ConsoleMessage> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry. Ids keep increasing across clears.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
