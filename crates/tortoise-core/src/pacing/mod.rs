//! Request pacing: how long to wait before the next external operation and
//! which access identity to present.
//!
//! State is per run and never persisted; a restart resumes with cold pacing.

mod controller;
mod jitter;

pub use controller::{FailureAction, PacingController, DEFAULT_IDENTITIES};
pub use jitter::{jittered, jittered_with};
