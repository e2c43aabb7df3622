mod common;

use std::time::{Duration, Instant};

use common::{orchestrator, throttled, Scripted};
use tortoise_core::checkpoint::{CheckpointStore, DiscoveredItem, ScanCheckpointer, ScanProgress};
use tortoise_core::classify::ErrorCategory;
use tortoise_core::control::RunControl;
use tortoise_core::retry::OperationFailure;

fn sources(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn checkpointer(dir: &tempfile::TempDir, interval: Duration) -> ScanCheckpointer {
    let store = CheckpointStore::new(dir.path().join("scan.json"));
    ScanCheckpointer::open(store, interval, Instant::now()).unwrap()
}

fn saved(dir: &tempfile::TempDir) -> ScanProgress {
    CheckpointStore::<ScanProgress>::new(dir.path().join("scan.json"))
        .load()
        .unwrap()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn sources_are_enumerated_and_checkpointed() {
    let dir = tempfile::tempdir().unwrap();
    let collab = Scripted::new();
    collab.on_enumerate("chan-a", &["a1", "a2"], Ok(()));
    collab.on_enumerate("chan-b", &["b1"], Ok(()));
    let orch = orchestrator(&collab, RunControl::new());
    let mut cp = checkpointer(&dir, Duration::from_secs(300));

    let report = orch.run_scan(&sources(&["chan-a", "chan-b"]), &mut cp).await;

    let totals = report.scan.unwrap();
    assert_eq!(totals.completed, 2);
    assert_eq!(totals.items, 3);
    assert_eq!(report.successes, 2);
    assert_eq!(report.total_errors, 0);
    // One per completed source plus the final flush.
    assert_eq!(report.checkpoint_saves, 3);

    let progress = saved(&dir);
    assert!(progress.is_complete("chan-a"));
    let ids: Vec<_> = progress.source("chan-a").unwrap().items.iter().map(|i| i.id.clone()).collect();
    assert_eq!(ids, ["a1", "a2"]);
}

#[tokio::test(start_paused = true)]
async fn complete_sources_are_skipped_on_resume() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut prior = ScanProgress::new();
        prior.add_item("chan-a", DiscoveredItem::new("a1"), chrono::Utc::now());
        prior.mark_complete("chan-a", chrono::Utc::now());
        prior.add_item("chan-b", DiscoveredItem::new("b1"), chrono::Utc::now());
        let mut store = CheckpointStore::new(dir.path().join("scan.json"));
        store.save(&prior).unwrap();
    }
    let collab = Scripted::new();
    collab.on_enumerate("chan-b", &["b1", "b2"], Ok(()));
    let orch = orchestrator(&collab, RunControl::new());
    let mut cp = checkpointer(&dir, Duration::ZERO);

    let report = orch.run_scan(&sources(&["chan-a", "chan-b"]), &mut cp).await;

    assert!(collab.calls_for("chan-a").is_empty());
    let totals = report.scan.unwrap();
    assert_eq!(totals.skipped, 1);
    assert_eq!(totals.completed, 2);
    let progress = saved(&dir);
    assert_eq!(progress.source("chan-b").unwrap().items.len(), 2);
    assert!(dir.path().join("scan.json.backup").exists());
}

#[tokio::test(start_paused = true)]
async fn throttled_enumeration_is_retried_and_keeps_partial_items() {
    let dir = tempfile::tempdir().unwrap();
    let collab = Scripted::new();
    collab.on_enumerate("chan", &["v1", "v2"], Err(throttled()));
    collab.on_enumerate("chan", &["v1", "v2", "v3"], Ok(()));
    let orch = orchestrator(&collab, RunControl::new());
    let mut cp = checkpointer(&dir, Duration::ZERO);

    let report = orch.run_scan(&sources(&["chan"]), &mut cp).await;

    let calls = collab.calls_for("chan");
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].identity, calls[1].identity);
    assert_eq!(report.count(ErrorCategory::RateLimited), 1);
    let progress = saved(&dir);
    let source = progress.source("chan").unwrap();
    assert!(source.complete);
    assert_eq!(source.items.len(), 3);
    assert!(source.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_leaves_source_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    let collab = Scripted::new();
    collab.on_enumerate(
        "members",
        &["m1"],
        Err(OperationFailure::message("ERROR: Join this channel to get access to members-only content")),
    );
    collab.on_enumerate("open", &["o1"], Ok(()));
    let orch = orchestrator(&collab, RunControl::new());
    let mut cp = checkpointer(&dir, Duration::ZERO);

    let report = orch.run_scan(&sources(&["members", "open"]), &mut cp).await;

    assert_eq!(collab.calls_for("members").len(), 1);
    assert_eq!(report.count(ErrorCategory::MembersOnly), 1);
    let progress = saved(&dir);
    let members = progress.source("members").unwrap();
    assert!(!members.complete);
    assert_eq!(members.items.len(), 1);
    assert!(members.last_error.as_deref().unwrap().contains("members-only"));
    assert!(progress.is_complete("open"));
    assert_eq!(report.scan.unwrap().completed, 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_flushes_partial_progress() {
    let dir = tempfile::tempdir().unwrap();
    let collab = Scripted::new();
    collab.on_enumerate("huge", &["h1", "h2", "h3"], Ok(()));
    collab.hang("huge");
    let control = RunControl::new();
    let orch = orchestrator(&collab, control.clone());
    let mut cp = checkpointer(&dir, Duration::ZERO);

    let canceller = control.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        canceller.cancel();
    });
    let report = orch.run_scan(&sources(&["huge", "never"]), &mut cp).await;

    assert!(report.cancelled);
    assert!(collab.calls_for("never").is_empty());
    let progress = saved(&dir);
    assert!(!progress.is_complete("huge"));
    assert_eq!(progress.source("huge").unwrap().items.len(), 3);
}
