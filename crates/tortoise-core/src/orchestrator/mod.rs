//! Drives the pacing → operation → classify → update loop.
//!
//! Two loops share one [`Orchestrator`]: [`Orchestrator::run_downloads`] works
//! through the job queue, and [`Orchestrator::run_scan`] enumerates sources
//! into scan progress. [`Orchestrator::health_check`] runs a single operation.
//! Pacing and classifier state live here, per run.

mod download;
mod health;
mod report;
mod scan;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::classify::{ErrorCategory, ErrorClassifier};
use crate::collaborator::Collaborator;
use crate::control::{Cancelled, RunControl};
use crate::pacing::{jittered, PacingController};
use crate::retry::OperationFailure;

pub use download::DownloadOptions;
pub use health::{HealthOutcome, HealthReport};
pub use report::{RunKind, RunReport, ScanTotals, HIGH_ERROR_RATE};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner {
    collaborator: Arc<dyn Collaborator>,
    pacing: Mutex<PacingController>,
    /// Held across a pacing sleep; workers leave it one delay apart.
    pacing_gate: tokio::sync::Mutex<()>,
    classifier: Mutex<ErrorClassifier>,
    control: RunControl,
}

/// Run-scoped orchestrator. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
    jitter_fraction: f64,
}

impl Orchestrator {
    pub fn new(
        collaborator: Arc<dyn Collaborator>,
        pacing: PacingController,
        classifier: ErrorClassifier,
        control: RunControl,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                collaborator,
                pacing: Mutex::new(pacing),
                pacing_gate: tokio::sync::Mutex::new(()),
                classifier: Mutex::new(classifier),
                control,
            }),
            jitter_fraction: 0.0,
        }
    }

    /// Spread each pacing sleep by a random factor in `[1 - fraction, 1 + fraction]`.
    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction;
        self
    }

    pub fn control(&self) -> &RunControl {
        &self.inner.control
    }

    /// Copy of the current pacing state.
    pub fn pacing(&self) -> PacingController {
        lock(&self.inner.pacing).clone()
    }

    pub fn total_errors(&self) -> u64 {
        lock(&self.inner.classifier).total_errors()
    }

    fn finish(&self, report: RunReport) -> RunReport {
        report.with_errors(&lock(&self.inner.classifier))
    }

    fn identity(&self) -> String {
        lock(&self.inner.pacing).current_identity().to_string()
    }

    /// Sleep the pacing delay (jittered) before the next unit of work.
    /// With several workers the sleeps queue up, so operations stay spaced
    /// out instead of going out together.
    async fn pacing_wait(&self) -> Result<(), Cancelled> {
        let _gate = self.inner.pacing_gate.lock().await;
        let base = lock(&self.inner.pacing).before_operation();
        let wait = jittered(base, self.jitter_fraction);
        if !wait.is_zero() {
            tracing::debug!(delay_ms = wait.as_millis() as u64, "pacing");
        }
        self.inner.control.sleep(wait).await
    }

    fn record_success(&self) {
        lock(&self.inner.pacing).record_success();
    }

    fn record_error(&self, identifier: &str, failure: &OperationFailure) -> ErrorCategory {
        lock(&self.inner.classifier).record(identifier, failure)
    }

    fn pacing_after_failure(&self, category: ErrorCategory, attempt: u32) -> crate::pacing::FailureAction {
        lock(&self.inner.pacing).record_failure(category, attempt)
    }
}
