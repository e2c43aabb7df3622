//! Retry and backoff policy.
//!
//! This module holds the exponential backoff used for both job retries and
//! request pacing, the failure value returned by the external collaborator,
//! and the short fixed schedule used to re-attempt one unit of work.

mod error;
mod policy;
mod run;

pub use error::OperationFailure;
pub use policy::{delay, BackoffPolicy, JOB_CAP_MULTIPLIER, PACING_CAP_MULTIPLIER};
pub use run::SubAttemptPolicy;
