//! History log — the ordered Thought/Action/Observation transcript of a run.
//!
//! The log is:
//!
//! - **Run-scoped**: cleared when a new run starts, readable until then
//! - **Append-only**: entries are never edited or reordered
//! - **Renderable**: produces the transcript fed back into every prompt

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Data Structures ───────────────────────────────────────────────────────

/// The kind of transcript entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HistoryKind {
    Thought,
    Action,
    Observation,
}

impl HistoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thought => "Thought",
            Self::Action => "Action",
            Self::Observation => "Observation",
        }
    }
}

impl fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    pub text: String,
    /// Zero-based position in append order.
    pub index: usize,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Render as a transcript line, e.g. `Observation: 42`.
    pub fn render(&self) -> String {
        format!("{}: {}", self.kind, self.text)
    }
}

/// Append-only transcript for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

// ── Implementation ────────────────────────────────────────────────────────

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry. Called at the start of each run.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Append an entry and return its index.
    pub fn append(&mut self, kind: HistoryKind, text: impl Into<String>) -> usize {
        let index = self.entries.len();
        self.entries.push(HistoryEntry {
            kind,
            text: text.into(),
            index,
            recorded_at: Utc::now(),
        });
        index
    }

    /// Entries in append order, borrowed.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Owned copy of every entry, in append order.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.clone()
    }

    /// Rendered `Kind: text` lines, in append order.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(HistoryEntry::render).collect()
    }

    /// The newline-joined transcript used as model context.
    pub fn transcript(&self) -> String {
        self.lines().join("\n")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
