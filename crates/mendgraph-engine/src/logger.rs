//! Change logging and progress feedback.
//!
//! The change log is a domain artifact: one entry per repair, written next
//! to the document by the storage layer. Whether it is empty tells the
//! caller if the repaired document has to be re-synchronized. Diagnostics
//! go through `tracing` instead.

use chrono::{DateTime, Utc};
use mendgraph_model::Guid;
use serde::Serialize;

/// Receives every mutation and deletion made during pass 2.
pub trait ChangeLogger {
    fn log_change(&mut self, guid: Guid, date: DateTime<Utc>, description: &str);
}

/// Log a change stamped with the current time.
pub fn log_now(logger: &mut dyn ChangeLogger, guid: Guid, description: &str) {
    logger.log_change(guid, Utc::now(), description);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEntry {
    pub guid: Guid,
    pub date: DateTime<Utc>,
    pub description: String,
}

impl ChangeEntry {
    /// `<guid> <rfc3339 date> <description>`, the change-log file line.
    pub fn to_line(&self) -> String {
        format!("{} {} {}", self.guid, self.date.to_rfc3339(), self.description)
    }
}

/// In-memory change log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeLog {
    entries: Vec<ChangeEntry>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mentions(&self, guid: Guid) -> bool {
        self.entries.iter().any(|e| e.guid == guid)
    }
}

impl ChangeLogger for ChangeLog {
    fn log_change(&mut self, guid: Guid, date: DateTime<Utc>, description: &str) {
        self.entries.push(ChangeEntry {
            guid,
            date,
            description: description.to_string(),
        });
    }
}

/// Counts what passes through, per fixer.
pub(crate) struct CountingLogger<'a> {
    inner: &'a mut dyn ChangeLogger,
    pub(crate) count: usize,
}

impl<'a> CountingLogger<'a> {
    pub(crate) fn new(inner: &'a mut dyn ChangeLogger) -> Self {
        Self { inner, count: 0 }
    }
}

impl ChangeLogger for CountingLogger<'_> {
    fn log_change(&mut self, guid: Guid, date: DateTime<Utc>, description: &str) {
        self.count += 1;
        self.inner.log_change(guid, date, description);
    }
}

/// Progress feedback; purely informational.
pub trait ProgressReporter {
    fn set_maximum(&mut self, maximum: u64);
    fn set_position(&mut self, position: u64);
    fn set_message(&mut self, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn set_maximum(&mut self, _maximum: u64) {}
    fn set_position(&mut self, _position: u64) {}
    fn set_message(&mut self, _message: &str) {}
}
