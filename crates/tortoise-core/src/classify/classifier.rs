//! Run-scoped error accumulator.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::retry::OperationFailure;

use super::rules;
use super::sink::ErrorLog;
use super::ErrorCategory;

/// Sample messages kept per category for operator inspection.
pub const MAX_SAMPLES: usize = 5;

/// Raw messages are truncated to this many characters when recorded.
pub const MAX_MESSAGE_LEN: usize = 500;

/// One observed failure. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub category: ErrorCategory,
    pub identifier: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Aggregate for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryStats {
    pub count: u64,
    pub identifiers: BTreeSet<String>,
    /// First `MAX_SAMPLES` messages seen; later ones are not retained.
    pub samples: Vec<String>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl CategoryStats {
    fn observe(&mut self, record: &ErrorRecord) {
        self.count += 1;
        self.identifiers.insert(record.identifier.clone());
        if self.samples.len() < MAX_SAMPLES {
            self.samples.push(record.message.clone());
        }
        if self.first_seen.is_none() {
            self.first_seen = Some(record.timestamp);
        }
        self.last_seen = Some(record.timestamp);
    }
}

/// Maps failures onto [`ErrorCategory`] and accumulates statistics for one run.
///
/// Owned by the orchestrator; two classifiers never share state.
#[derive(Debug, Default)]
pub struct ErrorClassifier {
    records: Vec<ErrorRecord>,
    stats: BTreeMap<ErrorCategory, CategoryStats>,
    log: Option<ErrorLog>,
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also append every record to the given error-log sink.
    pub fn with_error_log(mut self, log: ErrorLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Classify without recording.
    pub fn classify(&self, failure: &OperationFailure) -> ErrorCategory {
        rules::classify(failure)
    }

    /// Classify and record a failure observed now.
    pub fn record(&mut self, identifier: &str, failure: &OperationFailure) -> ErrorCategory {
        self.record_at(identifier, failure, Utc::now())
    }

    /// Classify and record a failure observed at `now`.
    pub fn record_at(
        &mut self,
        identifier: &str,
        failure: &OperationFailure,
        now: DateTime<Utc>,
    ) -> ErrorCategory {
        let category = self.classify(failure);
        let record = ErrorRecord {
            category,
            identifier: identifier.to_string(),
            timestamp: now,
            message: truncate(&failure.message, MAX_MESSAGE_LEN),
        };
        tracing::debug!(
            category = %category,
            identifier,
            status = ?failure.status,
            "classified failure"
        );
        if let Some(log) = &self.log {
            if let Err(e) = log.append(&record) {
                tracing::warn!("could not write error log {}: {}", log.path().display(), e);
            }
        }
        self.stats.entry(category).or_default().observe(&record);
        self.records.push(record);
        category
    }

    pub fn total_errors(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn stats(&self, category: ErrorCategory) -> Option<&CategoryStats> {
        self.stats.get(&category)
    }

    /// Categories that occurred, by descending count (taxonomy order on ties).
    pub fn report(&self) -> Vec<(ErrorCategory, CategoryStats)> {
        let mut out: Vec<_> = self
            .stats
            .iter()
            .filter(|(_, s)| s.count > 0)
            .map(|(c, s)| (*c, s.clone()))
            .collect();
        out.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(&b.0)));
        out
    }
}

fn truncate(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}
