//! One-shot check that the collaborator can reach a known target.

use std::fmt::Write as _;
use std::time::Duration;

use tokio::time::Instant;

use super::Orchestrator;
use crate::classify::{recommendation, ErrorCategory};

/// What a single health-check operation ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthOutcome {
    Healthy,
    Failed {
        category: ErrorCategory,
        status: Option<u16>,
        message: String,
        /// Pacing delay to observe before the next run; throttling only.
        suggested_wait: Option<Duration>,
    },
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub reference: String,
    pub identity: String,
    pub elapsed: Duration,
    pub outcome: HealthOutcome,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        matches!(self.outcome, HealthOutcome::Healthy)
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        match &self.outcome {
            HealthOutcome::Failed { category, .. } => Some(*category),
            _ => None,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Health check");
        let _ = writeln!(out, "============");
        let _ = writeln!(out, "Target: {}", self.reference);
        let _ = writeln!(out, "Identity: {}", self.identity);
        let _ = writeln!(out, "Response time: {:.2}s", self.elapsed.as_secs_f64());

        match &self.outcome {
            HealthOutcome::Healthy => {
                let _ = writeln!(out, "Status: HEALTHY");
                let _ = writeln!(out, "No throttling detected; runs should proceed normally.");
            }
            HealthOutcome::Interrupted => {
                let _ = writeln!(out, "Status: INTERRUPTED");
            }
            HealthOutcome::Failed {
                category,
                status,
                message,
                suggested_wait,
            } => {
                let _ = writeln!(out, "Status: UNHEALTHY");
                match status {
                    Some(code) => {
                        let _ = writeln!(out, "Category: {} (HTTP {})", category.label(), code);
                    }
                    None => {
                        let _ = writeln!(out, "Category: {}", category.label());
                    }
                }
                let _ = writeln!(out, "Error: {}", message);
                if let Some(wait) = suggested_wait {
                    let _ = writeln!(out, "Wait at least {}s before the next run.", wait.as_secs());
                }
                if *category == ErrorCategory::PrivateOrDeleted {
                    let _ = writeln!(out, "The target itself is gone; this says nothing about throttling.");
                }
                let _ = writeln!(out, "Recommendation:");
                let _ = writeln!(out, "  {}", recommendation(*category, 1));
            }
        }
        out
    }
}

impl Orchestrator {
    /// Perform one operation on `reference` with the current identity and
    /// classify the result. A throttling failure feeds the pacing state, and
    /// the resulting delay is reported as the wait before the next run.
    pub async fn health_check(&self, reference: &str) -> HealthReport {
        let identity = self.identity();
        tracing::info!(reference, identity = %identity, "health check");
        let started = Instant::now();
        let result = tokio::select! {
            r = self.inner.collaborator.perform(reference, &identity) => Some(r),
            _ = self.control().cancelled() => None,
        };
        let elapsed = started.elapsed();

        let outcome = match result {
            None => HealthOutcome::Interrupted,
            Some(Ok(())) => {
                self.record_success();
                HealthOutcome::Healthy
            }
            Some(Err(failure)) => {
                let category = self.record_error(reference, &failure);
                let suggested_wait = category.is_retryable().then(|| {
                    self.pacing_after_failure(category, u32::MAX);
                    self.pacing().next_delay()
                });
                tracing::warn!(category = %category, "health check failed: {}", failure.message);
                HealthOutcome::Failed {
                    category,
                    status: failure.status,
                    message: failure.message,
                    suggested_wait,
                }
            }
        };
        HealthReport {
            reference: reference.to_string(),
            identity,
            elapsed,
            outcome,
        }
    }
}
