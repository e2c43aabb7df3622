//! Persistent, retry-aware job queue.
//!
//! Jobs live in an in-memory table keyed by identifier with explicit state
//! tags. The whole table is exported as a [`QueueSnapshot`] and written
//! through a `CheckpointStore`; restoring a snapshot resets any job a crashed
//! run left `in_progress` back to `pending`.

mod error;
mod populate;
mod store;
mod types;

pub use error::QueueError;
pub use populate::{populate, render_reference, PopulateReport};
pub use store::JobQueue;
pub use types::{ClassifiedError, Enqueued, Job, JobState, NewJob, QueueSnapshot, StatusSummary};

#[cfg(test)]
mod tests;
