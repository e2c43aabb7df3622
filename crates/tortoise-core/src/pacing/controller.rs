use std::time::Duration;

use crate::classify::ErrorCategory;
use crate::retry::{BackoffPolicy, SubAttemptPolicy};

/// Rotation used when none is configured.
pub const DEFAULT_IDENTITIES: [&str; 4] = ["tv", "web_safari", "web", "android"];

/// What the caller should do after a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Re-attempt the same unit after this wait, using the (rotated) current identity.
    Retry(Duration),
    /// Retryable failure, but the sub-attempt budget is spent.
    Exhausted,
    /// Permanent failure: record it and move on.
    Skip,
}

/// Adaptive pacing state for one run.
#[derive(Debug, Clone)]
pub struct PacingController {
    identities: Vec<String>,
    identity_index: usize,
    consecutive_failures: u32,
    backoff: BackoffPolicy,
    sub_attempts: SubAttemptPolicy,
    operations: u64,
}

impl PacingController {
    /// `identities` is the rotation order; an empty list falls back to
    /// [`DEFAULT_IDENTITIES`].
    pub fn new(backoff: BackoffPolicy, identities: Vec<String>, sub_attempts: SubAttemptPolicy) -> Self {
        let identities = if identities.is_empty() {
            tracing::warn!("no access identities configured, using defaults");
            DEFAULT_IDENTITIES.iter().map(|s| s.to_string()).collect()
        } else {
            identities
        };
        Self {
            identities,
            identity_index: 0,
            consecutive_failures: 0,
            backoff,
            sub_attempts,
            operations: 0,
        }
    }

    /// Pacing with the default identity rotation and sub-attempt schedule.
    pub fn with_base_interval(base_interval: Duration) -> Self {
        Self::new(
            BackoffPolicy::pacing(base_interval),
            Vec::new(),
            SubAttemptPolicy::default(),
        )
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn identity_index(&self) -> usize {
        self.identity_index
    }

    pub fn identities(&self) -> &[String] {
        &self.identities
    }

    pub fn current_identity(&self) -> &str {
        &self.identities[self.identity_index % self.identities.len()]
    }

    /// Pacing delay for the current failure streak, without jitter.
    pub fn next_delay(&self) -> Duration {
        self.backoff.delay(self.consecutive_failures)
    }

    /// Wait before the next unit of work. The first operation of a run goes
    /// out immediately; every later one waits [`next_delay`](Self::next_delay).
    pub fn before_operation(&mut self) -> Duration {
        let wait = if self.operations == 0 {
            Duration::ZERO
        } else {
            self.next_delay()
        };
        self.operations += 1;
        wait
    }

    pub fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            tracing::debug!(
                identity = %self.current_identity(),
                previous_failures = self.consecutive_failures,
                "pacing reset after success"
            );
        }
        self.consecutive_failures = 0;
    }

    /// Update state after failed attempt number `attempt` (1-based) of one
    /// unit of work and decide whether to re-attempt it.
    pub fn record_failure(&mut self, category: ErrorCategory, attempt: u32) -> FailureAction {
        if !category.is_retryable() {
            return FailureAction::Skip;
        }
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let from = self.identity_index;
        self.identity_index = (self.identity_index + 1) % self.identities.len();
        tracing::info!(
            category = %category,
            consecutive_failures = self.consecutive_failures,
            identity = %self.current_identity(),
            previous_identity = %self.identities[from],
            delay_ms = self.next_delay().as_millis() as u64,
            "throttled, rotating access identity"
        );
        match self.sub_attempts.delay_after(attempt) {
            Some(wait) => FailureAction::Retry(wait),
            None => FailureAction::Exhausted,
        }
    }
}
