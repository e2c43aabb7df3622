use super::JobState;

/// Queue operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The identifier already completed; callers should consult prior results.
    #[error("job {0} already completed")]
    AlreadyCompleted(String),
    #[error("job {0} not found")]
    NotFound(String),
    #[error("job {identifier}: cannot {action} from state {from}")]
    InvalidTransition {
        identifier: String,
        from: JobState,
        action: &'static str,
    },
}
