mod common;

use std::time::Duration;

use common::{age_gate, orchestrator, throttled, unavailable, Scripted};
use tortoise_core::classify::ErrorCategory;
use tortoise_core::control::RunControl;
use tortoise_core::orchestrator::HealthOutcome;

#[tokio::test(start_paused = true)]
async fn reachable_target_is_healthy() {
    let collab = Scripted::new();
    let orch = orchestrator(&collab, RunControl::new());

    let report = orch.health_check("known-target").await;

    assert!(report.is_healthy());
    assert_eq!(report.identity, "tv");
    assert_eq!(collab.calls_for("known-target").len(), 1);
    assert_eq!(orch.total_errors(), 0);
}

#[tokio::test(start_paused = true)]
async fn throttled_target_reports_wait_from_pacing() {
    let collab = Scripted::new();
    collab.always_fail("t", throttled(), 1);
    let orch = orchestrator(&collab, RunControl::new());

    let report = orch.health_check("t").await;

    assert_eq!(report.category(), Some(ErrorCategory::RateLimited));
    match &report.outcome {
        HealthOutcome::Failed {
            status,
            suggested_wait,
            ..
        } => {
            assert_eq!(*status, Some(429));
            // One failure on a 1s base interval.
            assert_eq!(*suggested_wait, Some(Duration::from_secs(2)));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(collab.calls_for("t").len(), 1);
    assert_eq!(orch.total_errors(), 1);
    assert!(report.render().contains("Rate limited (1)"));
}

#[tokio::test(start_paused = true)]
async fn unavailable_content_counts_as_throttling() {
    let collab = Scripted::new();
    collab.always_fail("t", unavailable(), 1);
    let orch = orchestrator(&collab, RunControl::new());

    let report = orch.health_check("t").await;

    assert_eq!(report.category(), Some(ErrorCategory::RateLimited));
    assert_eq!(orch.pacing().consecutive_failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_has_no_suggested_wait() {
    let collab = Scripted::new();
    collab.always_fail("t", age_gate(), 1);
    let orch = orchestrator(&collab, RunControl::new());

    let report = orch.health_check("t").await;

    assert_eq!(report.category(), Some(ErrorCategory::AgeRestricted));
    assert!(matches!(
        report.outcome,
        HealthOutcome::Failed {
            suggested_wait: None,
            ..
        }
    ));
    assert_eq!(orch.pacing().consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_a_hanging_check() {
    let collab = Scripted::new();
    collab.hang("t");
    let control = RunControl::new();
    let orch = orchestrator(&collab, control.clone());

    let canceller = control.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        canceller.cancel();
    });
    let report = orch.health_check("t").await;

    assert_eq!(report.outcome, HealthOutcome::Interrupted);
    assert!(!report.is_healthy());
    assert!(report.render().contains("INTERRUPTED"));
}
