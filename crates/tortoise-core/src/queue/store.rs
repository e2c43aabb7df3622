//! In-memory job table with mutual exclusion around every transition.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use crate::retry::BackoffPolicy;

use super::types::{ClassifiedError, Enqueued, Job, JobState, NewJob, QueueSnapshot, StatusSummary};
use super::QueueError;

#[derive(Debug, Default)]
struct Table {
    jobs: Vec<Job>,
    index: HashMap<String, usize>,
}

impl Table {
    fn from_jobs(jobs: Vec<Job>) -> Self {
        let mut table = Table::default();
        for job in jobs {
            if table.index.contains_key(&job.identifier) {
                tracing::warn!(job = %job.identifier, "duplicate job in snapshot ignored");
                continue;
            }
            table.index.insert(job.identifier.clone(), table.jobs.len());
            table.jobs.push(job);
        }
        table
    }

    fn get_mut(&mut self, identifier: &str) -> Result<&mut Job, QueueError> {
        let idx = *self
            .index
            .get(identifier)
            .ok_or_else(|| QueueError::NotFound(identifier.to_string()))?;
        Ok(&mut self.jobs[idx])
    }
}

/// Durable-by-snapshot work list with per-job retry scheduling.
///
/// Safe to share between workers: claiming a job and marking it
/// `in_progress` happen under one lock, so no two callers hold the same job.
#[derive(Debug)]
pub struct JobQueue {
    table: Mutex<Table>,
    max_attempts: u32,
    backoff: BackoffPolicy,
}

impl JobQueue {
    /// Empty queue. `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, backoff: BackoffPolicy) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Queue restored from a snapshot (see [`restore`](Self::restore)).
    pub fn from_snapshot(snapshot: QueueSnapshot, max_attempts: u32, backoff: BackoffPolicy) -> Self {
        let queue = Self::new(max_attempts, backoff);
        queue.restore(snapshot);
        queue
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a `pending` job unless the identifier is already known.
    pub fn enqueue(&self, identifier: &str, source_reference: &str) -> Result<Enqueued, QueueError> {
        self.enqueue_job(NewJob::new(identifier, source_reference), Utc::now())
    }

    /// Insert a `pending` job eligible from `now`. Existing non-completed jobs
    /// are left untouched; a completed identifier is rejected.
    pub fn enqueue_job(&self, new: NewJob, now: DateTime<Utc>) -> Result<Enqueued, QueueError> {
        let mut table = self.lock();
        if let Some(&idx) = table.index.get(&new.identifier) {
            let state = table.jobs[idx].state;
            if state == JobState::Completed {
                return Err(QueueError::AlreadyCompleted(new.identifier));
            }
            return Ok(Enqueued::Exists(state));
        }
        let job = Job {
            identifier: new.identifier.clone(),
            source_reference: new.source_reference,
            state: JobState::Pending,
            attempt_count: 0,
            next_eligible_time: now,
            last_error: None,
            title: new.title,
            origin: new.origin,
            added_at: now,
            last_attempt_at: None,
            completed_at: None,
        };
        let idx = table.jobs.len();
        table.index.insert(new.identifier, idx);
        table.jobs.push(job);
        Ok(Enqueued::Added)
    }

    /// Claim the eligible job with the earliest `next_eligible_time` (insertion
    /// order on ties) and mark it `in_progress`. `None` if nothing is eligible.
    pub fn claim_next(&self, now: DateTime<Utc>) -> Option<Job> {
        let mut table = self.lock();
        let idx = table
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| match j.state {
                JobState::Pending => true,
                JobState::Retrying => j.next_eligible_time <= now,
                _ => false,
            })
            .min_by_key(|(i, j)| (j.next_eligible_time, *i))
            .map(|(i, _)| i)?;
        let job = &mut table.jobs[idx];
        job.state = JobState::InProgress;
        job.last_attempt_at = Some(now);
        tracing::debug!(job = %job.identifier, attempt = job.attempt_count + 1, "job claimed");
        Some(job.clone())
    }

    /// Transition a job to `completed`.
    pub fn record_success(&self, identifier: &str, now: DateTime<Utc>) -> Result<(), QueueError> {
        let mut table = self.lock();
        let job = table.get_mut(identifier)?;
        if job.state.is_terminal() {
            return Err(QueueError::InvalidTransition {
                identifier: identifier.to_string(),
                from: job.state,
                action: "complete",
            });
        }
        job.state = JobState::Completed;
        job.completed_at = Some(now);
        tracing::info!(job = %identifier, attempts = job.attempt_count + 1, "job completed");
        Ok(())
    }

    /// Count a failed attempt. The job becomes `failed` once `attempt_count`
    /// reaches the maximum, otherwise `retrying` with a backed-off eligibility
    /// time. Returns the updated job.
    pub fn record_failure(
        &self,
        identifier: &str,
        error: ClassifiedError,
        now: DateTime<Utc>,
    ) -> Result<Job, QueueError> {
        let mut table = self.lock();
        let job = table.get_mut(identifier)?;
        if job.state.is_terminal() {
            return Err(QueueError::InvalidTransition {
                identifier: identifier.to_string(),
                from: job.state,
                action: "fail",
            });
        }
        job.attempt_count = job.attempt_count.saturating_add(1);
        let wait = self.backoff.delay(job.attempt_count);
        let candidate = chrono::Duration::from_std(wait)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        job.next_eligible_time = job.next_eligible_time.max(candidate);
        job.last_error = Some(error);
        if job.attempt_count >= self.max_attempts {
            job.state = JobState::Failed;
            tracing::warn!(
                job = %identifier,
                attempts = job.attempt_count,
                "job failed permanently after reaching max attempts"
            );
        } else {
            job.state = JobState::Retrying;
            tracing::info!(
                job = %identifier,
                attempts = job.attempt_count,
                retry_in_secs = wait.as_secs(),
                "job scheduled for retry"
            );
        }
        Ok(job.clone())
    }

    /// Return an abandoned `in_progress` job to `pending` without counting an attempt.
    pub fn release(&self, identifier: &str) -> Result<(), QueueError> {
        let mut table = self.lock();
        let job = table.get_mut(identifier)?;
        if job.state != JobState::InProgress {
            return Err(QueueError::InvalidTransition {
                identifier: identifier.to_string(),
                from: job.state,
                action: "release",
            });
        }
        job.state = JobState::Pending;
        Ok(())
    }

    /// Export every job, in insertion order.
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            version: 1,
            saved_at: Utc::now(),
            jobs: self.lock().jobs.clone(),
        }
    }

    /// Replace the queue contents with `snapshot`. Jobs left `in_progress` by a
    /// previous run go back to `pending`. Returns how many were reset.
    pub fn restore(&self, snapshot: QueueSnapshot) -> usize {
        let mut reset = 0;
        let jobs = snapshot
            .jobs
            .into_iter()
            .map(|mut j| {
                if j.state == JobState::InProgress {
                    j.state = JobState::Pending;
                    reset += 1;
                }
                j
            })
            .collect();
        *self.lock() = Table::from_jobs(jobs);
        if reset > 0 {
            tracing::info!("recovered {} job(s) left in progress by a previous run", reset);
        }
        reset
    }

    pub fn status_summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::default();
        for job in &self.lock().jobs {
            summary.bump(job.state);
        }
        summary
    }

    pub fn get(&self, identifier: &str) -> Option<Job> {
        let table = self.lock();
        table.index.get(identifier).map(|&i| table.jobs[i].clone())
    }

    pub fn jobs_in_state(&self, state: JobState) -> Vec<Job> {
        self.lock()
            .jobs
            .iter()
            .filter(|j| j.state == state)
            .cloned()
            .collect()
    }

    /// Earliest time a `retrying` job becomes eligible.
    pub fn next_wakeup(&self) -> Option<DateTime<Utc>> {
        self.lock()
            .jobs
            .iter()
            .filter(|j| j.state == JobState::Retrying)
            .map(|j| j.next_eligible_time)
            .min()
    }

    /// True while any job is not yet terminal.
    pub fn has_unfinished(&self) -> bool {
        self.lock().jobs.iter().any(|j| !j.state.is_terminal())
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        *self.lock() = Table::default();
    }
}
