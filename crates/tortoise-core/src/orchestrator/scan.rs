//! Enumeration loop: one source at a time, streaming items into scan progress.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use super::{Orchestrator, RunKind, RunReport, ScanTotals};
use crate::checkpoint::ScanCheckpointer;
use crate::pacing::FailureAction;
use crate::retry::OperationFailure;

/// Items buffered between the collaborator and the checkpointer.
const ITEM_BUFFER: usize = 256;

impl Orchestrator {
    /// Enumerate every source not already complete in `checkpointer`.
    ///
    /// Sources are handled sequentially. Progress is saved when a source
    /// completes, when the checkpoint interval elapses, and on exit
    /// (including cancellation).
    pub async fn run_scan(&self, sources: &[String], checkpointer: &mut ScanCheckpointer) -> RunReport {
        let mut report = RunReport::new(RunKind::Scan);
        let mut totals = ScanTotals {
            sources: sources.len(),
            ..ScanTotals::default()
        };
        let saves_before = checkpointer.saves();
        let failed_before = checkpointer.failed_saves();

        'sources: for source in sources {
            if self.control().is_cancelled() {
                report.cancelled = true;
                break;
            }
            if checkpointer.progress().is_complete(source) {
                tracing::debug!(source = %source, "source already complete, skipping");
                totals.skipped += 1;
                continue;
            }
            if self.pacing_wait().await.is_err() {
                report.cancelled = true;
                break;
            }

            let mut attempt = 1u32;
            loop {
                let identity = self.identity();
                report.operations += 1;
                tracing::info!(source = %source, attempt, identity = %identity, "enumerating source");
                let Some(result) = self.enumerate_source(source, &identity, checkpointer).await else {
                    report.cancelled = true;
                    break 'sources;
                };
                let failure = match result {
                    Ok(()) => {
                        report.successes += 1;
                        self.record_success();
                        // A failed save is counted by the checkpointer and retried on the next trigger.
                        let _ = checkpointer.complete_source(source, Instant::now());
                        tracing::info!(
                            source = %source,
                            items = checkpointer.progress().source(source).map_or(0, |s| s.items.len()),
                            "source complete"
                        );
                        break;
                    }
                    Err(failure) => failure,
                };

                report.failures += 1;
                let category = self.record_error(source, &failure);
                let _ = checkpointer.record_error(source, &failure.message, Instant::now());
                let action = self.pacing_after_failure(category, attempt);
                match action {
                    FailureAction::Retry(wait) => {
                        if self.control().sleep(wait).await.is_err() {
                            report.cancelled = true;
                            break 'sources;
                        }
                        attempt += 1;
                    }
                    FailureAction::Exhausted | FailureAction::Skip => {
                        tracing::warn!(
                            source = %source,
                            category = %category,
                            "source left incomplete; it will be retried by the next scan"
                        );
                        break;
                    }
                }
            }
        }

        let _ = checkpointer.flush(Instant::now());

        let progress = checkpointer.progress();
        totals.completed = sources.iter().filter(|s| progress.is_complete(s)).count();
        totals.items = progress.total_items();
        report.scan = Some(totals);
        report.checkpoint_saves = checkpointer.saves() - saves_before;
        report.storage_failures = checkpointer.failed_saves() - failed_before;
        tracing::info!(
            sources = totals.sources,
            completed = totals.completed,
            items = totals.items,
            cancelled = report.cancelled,
            "scan run finished"
        );
        self.finish(report)
    }

    /// Run one enumeration, feeding items to the checkpointer as they arrive.
    /// `None` when cancelled; items received so far are kept either way.
    async fn enumerate_source(
        &self,
        source: &str,
        identity: &str,
        checkpointer: &mut ScanCheckpointer,
    ) -> Option<Result<(), OperationFailure>> {
        let collaborator = Arc::clone(&self.inner.collaborator);
        let (tx, mut rx) = mpsc::channel(ITEM_BUFFER);
        let op = collaborator.enumerate(source, identity, tx);
        tokio::pin!(op);

        let mut result = None;
        let mut closed = false;
        loop {
            tokio::select! {
                biased;
                _ = self.control().cancelled() => return None,
                item = rx.recv(), if !closed => match item {
                    Some(item) => {
                        let _ = checkpointer.record_item(source, item, Instant::now());
                    }
                    None => {
                        closed = true;
                        if let Some(r) = result.take() {
                            return Some(r);
                        }
                    }
                },
                r = &mut op, if result.is_none() => {
                    if closed {
                        return Some(r);
                    }
                    result = Some(r);
                }
            }
        }
    }
}
