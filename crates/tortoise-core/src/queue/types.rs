//! Types stored in the job queue and its snapshot.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::ErrorCategory;

/// Job lifecycle state. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    InProgress,
    Retrying,
    Completed,
    Failed,
}

impl JobState {
    pub const ALL: [JobState; 5] = [
        JobState::Pending,
        JobState::InProgress,
        JobState::Retrying,
        JobState::Completed,
        JobState::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::InProgress => "in_progress",
            JobState::Retrying => "retrying",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The most recent failure of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub message: String,
}

/// One retryable unit of download work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub identifier: String,
    pub source_reference: String,
    pub state: JobState,
    pub attempt_count: u32,
    /// Must not be attempted before this time.
    pub next_eligible_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ClassifiedError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Source the identifier was discovered from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for [`JobQueue::enqueue_job`](super::JobQueue::enqueue_job).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewJob {
    pub identifier: String,
    pub source_reference: String,
    pub title: Option<String>,
    pub origin: Option<String>,
}

impl NewJob {
    pub fn new(identifier: impl Into<String>, source_reference: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            source_reference: source_reference.into(),
            ..Default::default()
        }
    }
}

/// Result of an enqueue call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    Added,
    /// Already queued (non-completed); nothing changed.
    Exists(JobState),
}

/// Durable form of the whole queue. Jobs are in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    #[serde(default = "default_version")]
    pub version: u8,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

fn default_version() -> u8 {
    1
}

/// Job counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub pending: usize,
    pub in_progress: usize,
    pub retrying: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusSummary {
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.retrying + self.completed + self.failed
    }

    pub fn count(&self, state: JobState) -> usize {
        match state {
            JobState::Pending => self.pending,
            JobState::InProgress => self.in_progress,
            JobState::Retrying => self.retrying,
            JobState::Completed => self.completed,
            JobState::Failed => self.failed,
        }
    }

    pub(super) fn bump(&mut self, state: JobState) {
        match state {
            JobState::Pending => self.pending += 1,
            JobState::InProgress => self.in_progress += 1,
            JobState::Retrying => self.retrying += 1,
            JobState::Completed => self.completed += 1,
            JobState::Failed => self.failed += 1,
        }
    }
}
