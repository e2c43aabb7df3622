//! Download loop: workers claim jobs and run them through pacing and retry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;

use super::{lock, Orchestrator, RunKind, RunReport};
use crate::checkpoint::CheckpointStore;
use crate::pacing::FailureAction;
use crate::queue::{ClassifiedError, Job, JobQueue, QueueSnapshot};

/// Knobs for [`Orchestrator::run_downloads`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Concurrent workers; 1 is recommended.
    pub workers: usize,
    /// Sleep until retrying jobs are eligible instead of returning.
    pub wait_for_retries: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            wait_for_retries: true,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    operations: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    saves: AtomicU64,
    storage_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct DownloadRun {
    queue: Arc<JobQueue>,
    store: Mutex<CheckpointStore<QueueSnapshot>>,
    counters: Counters,
}

impl DownloadRun {
    /// Persist the whole queue. A failure is counted and logged; the run goes
    /// on with in-memory state and the next checkpoint tries again.
    fn checkpoint(&self) {
        let mut store = lock(&self.store);
        let snapshot = self.queue.snapshot();
        match store.save(&snapshot) {
            Ok(()) => Counters::bump(&self.counters.saves),
            Err(e) => {
                Counters::bump(&self.counters.storage_failures);
                tracing::error!(
                    path = %store.path().display(),
                    "queue checkpoint failed, continuing with in-memory state: {}",
                    e
                );
            }
        }
    }
}

impl Orchestrator {
    /// Work through `queue` until nothing is left to attempt, or until
    /// cancelled. The queue is checkpointed to `store` after every job outcome
    /// and once more at the end.
    pub async fn run_downloads(
        &self,
        queue: Arc<JobQueue>,
        store: CheckpointStore<QueueSnapshot>,
        options: DownloadOptions,
    ) -> RunReport {
        let workers = options.workers.max(1);
        let run = Arc::new(DownloadRun {
            queue,
            store: Mutex::new(store),
            counters: Counters::default(),
        });
        let mut report = RunReport::new(RunKind::Download);
        let mut join_set = JoinSet::new();

        tracing::info!(
            workers,
            jobs = run.queue.len(),
            "download run started"
        );

        loop {
            if self.control().is_cancelled() {
                report.cancelled = true;
                break;
            }

            while join_set.len() < workers {
                let Some(job) = run.queue.claim_next(Utc::now()) else {
                    break;
                };
                let this = self.clone();
                let run = Arc::clone(&run);
                join_set.spawn(async move { this.process_job(&run, job).await });
            }

            if join_set.is_empty() {
                match run.queue.next_wakeup() {
                    Some(at) if options.wait_for_retries => {
                        let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                        tracing::info!(
                            wait_secs = wait.as_secs(),
                            "waiting for the next retry to become eligible"
                        );
                        if self.control().sleep(wait).await.is_err() {
                            report.cancelled = true;
                            break;
                        }
                        continue;
                    }
                    Some(_) => {
                        tracing::info!("jobs remain scheduled for retry; run again later");
                        break;
                    }
                    None => break,
                }
            }

            tokio::select! {
                res = join_set.join_next() => {
                    if let Some(Err(e)) = res {
                        tracing::error!("download task failed: {}", e);
                    }
                }
                _ = self.control().cancelled() => {
                    report.cancelled = true;
                    break;
                }
            }
        }

        // Workers observe the same cancellation and release their jobs.
        while let Some(res) = join_set.join_next().await {
            if let Err(e) = res {
                tracing::error!("download task failed: {}", e);
            }
        }
        run.checkpoint();

        let c = &run.counters;
        report.operations = c.operations.load(Ordering::Relaxed);
        report.successes = c.successes.load(Ordering::Relaxed);
        report.failures = c.failures.load(Ordering::Relaxed);
        report.checkpoint_saves = c.saves.load(Ordering::Relaxed);
        report.storage_failures = c.storage_failures.load(Ordering::Relaxed);
        report.queue = Some(run.queue.status_summary());
        tracing::info!(
            operations = report.operations,
            failures = report.failures,
            cancelled = report.cancelled,
            "download run finished"
        );
        self.finish(report)
    }

    async fn process_job(&self, run: &DownloadRun, job: Job) {
        let id = job.identifier.as_str();
        if self.pacing_wait().await.is_err() {
            return abandon(run, id);
        }

        let mut attempt = 1u32;
        let outcome = loop {
            let identity = self.identity();
            Counters::bump(&run.counters.operations);
            tracing::debug!(job = id, attempt, identity = %identity, "attempting job");
            let result = tokio::select! {
                r = self.inner.collaborator.perform(&job.source_reference, &identity) => r,
                _ = self.control().cancelled() => return abandon(run, id),
            };
            let failure = match result {
                Ok(()) => {
                    Counters::bump(&run.counters.successes);
                    self.record_success();
                    break Ok(());
                }
                Err(failure) => failure,
            };
            Counters::bump(&run.counters.failures);
            let category = self.record_error(id, &failure);
            let action = self.pacing_after_failure(category, attempt);
            match action {
                FailureAction::Retry(wait) => {
                    tracing::info!(
                        job = id,
                        category = %category,
                        attempt,
                        wait_secs = wait.as_secs(),
                        "re-attempting with next identity"
                    );
                    if self.control().sleep(wait).await.is_err() {
                        return abandon(run, id);
                    }
                    attempt += 1;
                }
                FailureAction::Exhausted | FailureAction::Skip => {
                    break Err(ClassifiedError {
                        category,
                        message: failure.message,
                    });
                }
            }
        };

        let now = Utc::now();
        let recorded = match outcome {
            Ok(()) => run.queue.record_success(id, now),
            Err(error) => run.queue.record_failure(id, error, now).map(|_| ()),
        };
        if let Err(e) = recorded {
            tracing::error!(job = id, "could not record job outcome: {}", e);
        }
        run.checkpoint();
    }
}

/// Put a claimed job back so the next run attempts it again.
fn abandon(run: &DownloadRun, id: &str) {
    match run.queue.release(id) {
        Ok(()) => tracing::info!(job = id, "job abandoned on cancellation, back to pending"),
        Err(e) => tracing::warn!(job = id, "could not release job: {}", e),
    }
}
