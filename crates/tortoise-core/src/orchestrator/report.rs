//! End-of-run summary.

use std::fmt::Write as _;

use crate::classify::{recommendations, CategoryStats, ErrorCategory, ErrorClassifier, NO_ERRORS};
use crate::queue::StatusSummary;

/// Share of failed operations above which the summary warns.
pub const HIGH_ERROR_RATE: f64 = 0.20;

/// Which loop produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Scan,
    Download,
}

/// Source counts for a scan run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanTotals {
    pub sources: usize,
    pub completed: usize,
    /// Already complete from a previous run.
    pub skipped: usize,
    pub items: usize,
}

/// Counters and error statistics for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub kind: RunKind,
    pub operations: u64,
    pub successes: u64,
    pub failures: u64,
    pub checkpoint_saves: u64,
    pub storage_failures: u64,
    pub cancelled: bool,
    pub total_errors: u64,
    pub errors: Vec<(ErrorCategory, CategoryStats)>,
    pub queue: Option<StatusSummary>,
    pub scan: Option<ScanTotals>,
}

impl RunReport {
    pub fn new(kind: RunKind) -> Self {
        Self {
            kind,
            operations: 0,
            successes: 0,
            failures: 0,
            checkpoint_saves: 0,
            storage_failures: 0,
            cancelled: false,
            total_errors: 0,
            errors: Vec::new(),
            queue: None,
            scan: None,
        }
    }

    /// Copy the classifier's totals into the report.
    pub fn with_errors(mut self, classifier: &ErrorClassifier) -> Self {
        self.total_errors = classifier.total_errors();
        self.errors = classifier.report();
        self
    }

    pub fn error_rate(&self) -> f64 {
        if self.operations == 0 {
            0.0
        } else {
            self.failures as f64 / self.operations as f64
        }
    }

    pub fn high_error_rate(&self) -> bool {
        self.error_rate() > HIGH_ERROR_RATE
    }

    pub fn count(&self, category: ErrorCategory) -> u64 {
        self.errors
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, s)| s.count)
            .unwrap_or(0)
    }

    /// Operator-facing summary text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let title = match self.kind {
            RunKind::Scan => "Scan summary",
            RunKind::Download => "Download summary",
        };
        let _ = writeln!(out, "{}", title);
        let _ = writeln!(out, "{}", "=".repeat(title.len()));

        if self.storage_failures > 0 {
            let _ = writeln!(
                out,
                "!!! {} checkpoint save(s) FAILED. Progress since the last successful save exists only in memory; check the state directory.",
                self.storage_failures
            );
        }
        if self.cancelled {
            let _ = writeln!(out, "Run interrupted; state was checkpointed and will resume on the next run.");
        }

        let _ = writeln!(
            out,
            "Operations: {} ({} succeeded, {} failed)",
            self.operations, self.successes, self.failures
        );
        if let Some(q) = &self.queue {
            let _ = writeln!(
                out,
                "Queue: {} completed, {} failed, {} retrying, {} pending",
                q.completed, q.failed, q.retrying, q.pending
            );
        }
        if let Some(s) = &self.scan {
            let _ = writeln!(
                out,
                "Sources: {}/{} complete ({} already done), {} items discovered",
                s.completed, s.sources, s.skipped, s.items
            );
        }
        let _ = writeln!(out, "Checkpoints written: {}", self.checkpoint_saves);

        let _ = writeln!(out, "Errors: {}", self.total_errors);
        for (category, stats) in &self.errors {
            let _ = write!(
                out,
                "  {}: {} ({} affected)",
                category.label(),
                stats.count,
                stats.identifiers.len()
            );
            match stats.samples.first() {
                Some(sample) => {
                    let _ = writeln!(out, " e.g. \"{}\"", sample);
                }
                None => out.push('\n'),
            }
        }
        if self.total_errors == 0 {
            let _ = writeln!(out, "{}", NO_ERRORS);
        } else {
            let _ = writeln!(out, "Recommendations:");
            for line in recommendations(&self.errors) {
                let _ = writeln!(out, "  - {}", line);
            }
        }
        if self.high_error_rate() {
            let _ = writeln!(
                out,
                "WARNING: high error rate ({:.0}% of operations failed); consider a longer pacing interval.",
                self.error_rate() * 100.0
            );
        }
        out
    }
}
