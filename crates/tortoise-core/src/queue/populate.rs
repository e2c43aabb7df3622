use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::checkpoint::ScanProgress;

use super::{Enqueued, JobQueue, NewJob, QueueError};

/// Counts from one [`populate`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub added: usize,
    /// Already queued and not completed.
    pub existing: usize,
    /// Rejected because the job already completed.
    pub already_completed: usize,
    /// Skipped because the download archive lists them.
    pub archived: usize,
}

impl PopulateReport {
    pub fn seen(&self) -> usize {
        self.added + self.existing + self.already_completed + self.archived
    }
}

/// Substitute `{id}` in a reference template.
pub fn render_reference(template: &str, id: &str) -> String {
    template.replace("{id}", id)
}

/// Enqueue every discovered identifier, sources in name order and items in
/// discovery order. Identifiers present in more than one source are queued
/// once, with the first source as their origin.
pub fn populate(
    queue: &JobQueue,
    progress: &ScanProgress,
    reference_template: &str,
    archive: &HashSet<String>,
    now: DateTime<Utc>,
) -> PopulateReport {
    let mut report = PopulateReport::default();
    for (source, entry) in &progress.sources {
        for item in &entry.items {
            if archive.contains(&item.id) {
                report.archived += 1;
                continue;
            }
            let new = NewJob {
                identifier: item.id.clone(),
                source_reference: render_reference(reference_template, &item.id),
                title: item.title.clone(),
                origin: Some(source.clone()),
            };
            match queue.enqueue_job(new, now) {
                Ok(Enqueued::Added) => report.added += 1,
                Ok(Enqueued::Exists(_)) => report.existing += 1,
                Err(QueueError::AlreadyCompleted(_)) => report.already_completed += 1,
                Err(e) => tracing::warn!(job = %item.id, "enqueue failed: {}", e),
            }
        }
    }
    tracing::info!(
        added = report.added,
        existing = report.existing,
        already_completed = report.already_completed,
        archived = report.archived,
        "queue populated from scan results"
    );
    report
}
