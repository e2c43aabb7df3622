//! Tests for the job queue state machine, snapshots and population.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::checkpoint::{CheckpointStore, DiscoveredItem, ScanProgress};
use crate::classify::ErrorCategory;
use crate::queue::{
    populate, ClassifiedError, Enqueued, JobQueue, JobState, NewJob, QueueError, QueueSnapshot,
};
use crate::retry::BackoffPolicy;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn throttled() -> ClassifiedError {
    ClassifiedError {
        category: ErrorCategory::RateLimited,
        message: "HTTP Error 429: Too Many Requests".to_string(),
    }
}

fn queue(max_attempts: u32) -> JobQueue {
    JobQueue::new(max_attempts, BackoffPolicy::default())
}

fn add(q: &JobQueue, id: &str, at: DateTime<Utc>) {
    assert_eq!(
        q.enqueue_job(NewJob::new(id, format!("ref:{id}")), at).unwrap(),
        Enqueued::Added
    );
}

#[test]
fn enqueue_is_idempotent_and_keeps_original_reference() {
    let q = queue(5);
    assert_eq!(q.enqueue("a", "first").unwrap(), Enqueued::Added);
    assert_eq!(
        q.enqueue("a", "second").unwrap(),
        Enqueued::Exists(JobState::Pending)
    );
    assert_eq!(q.len(), 1);
    assert_eq!(q.get("a").unwrap().source_reference, "first");
}

#[test]
fn enqueue_of_completed_job_is_rejected() {
    let q = queue(5);
    add(&q, "a", t0());
    q.claim_next(t0()).unwrap();
    q.record_success("a", t0()).unwrap();
    assert_eq!(
        q.enqueue("a", "again"),
        Err(QueueError::AlreadyCompleted("a".to_string()))
    );
}

#[test]
fn enqueue_of_failed_job_is_a_noop() {
    let q = queue(1);
    add(&q, "a", t0());
    q.claim_next(t0()).unwrap();
    q.record_failure("a", throttled(), t0()).unwrap();
    assert_eq!(q.enqueue("a", "x").unwrap(), Enqueued::Exists(JobState::Failed));
    assert_eq!(q.get("a").unwrap().state, JobState::Failed);
}

#[test]
fn claim_marks_in_progress_and_is_exclusive() {
    let q = queue(5);
    add(&q, "a", t0());
    let job = q.claim_next(t0()).unwrap();
    assert_eq!(job.identifier, "a");
    assert_eq!(job.state, JobState::InProgress);
    assert_eq!(job.last_attempt_at, Some(t0()));
    assert!(q.claim_next(t0()).is_none());
}

#[test]
fn claim_orders_by_eligibility_then_insertion() {
    let q = queue(5);
    add(&q, "late", t0() + chrono::Duration::seconds(10));
    add(&q, "b", t0());
    add(&q, "c", t0());
    let now = t0() + chrono::Duration::seconds(30);
    let order: Vec<_> = std::iter::from_fn(|| q.claim_next(now))
        .map(|j| j.identifier)
        .collect();
    assert_eq!(order, ["b", "c", "late"]);
}

#[test]
fn retrying_job_waits_until_eligible() {
    let q = queue(5);
    add(&q, "a", t0());
    q.claim_next(t0()).unwrap();
    let job = q.record_failure("a", throttled(), t0()).unwrap();
    assert_eq!(job.state, JobState::Retrying);
    assert_eq!(job.next_eligible_time, t0() + chrono::Duration::seconds(120));

    assert!(q.claim_next(t0() + chrono::Duration::seconds(119)).is_none());
    assert_eq!(q.next_wakeup(), Some(job.next_eligible_time));
    assert!(q.claim_next(job.next_eligible_time).is_some());
}

#[test]
fn nth_failure_sets_attempt_count_and_state() {
    for max in 1..=6u32 {
        let q = queue(max);
        add(&q, "a", t0());
        let mut now = t0();
        for n in 1..=max {
            let claimed = q.claim_next(now).unwrap();
            assert_eq!(claimed.attempt_count, n - 1);
            let job = q.record_failure("a", throttled(), now).unwrap();
            assert_eq!(job.attempt_count, n);
            if n == max {
                assert_eq!(job.state, JobState::Failed);
            } else {
                assert_eq!(job.state, JobState::Retrying);
                assert!(job.next_eligible_time > now);
            }
            now = job.next_eligible_time;
        }
        assert!(q.claim_next(now + chrono::Duration::days(1)).is_none());
    }
}

#[test]
fn five_failures_follow_backoff_schedule() {
    let q = JobQueue::new(
        5,
        BackoffPolicy::job_retry(Duration::from_secs(60), Duration::from_secs(3600)),
    );
    add(&q, "a", t0());
    let mut now = t0();
    let mut deltas = Vec::new();
    let mut last = None;
    for _ in 0..5 {
        q.claim_next(now).unwrap();
        let job = q.record_failure("a", throttled(), now).unwrap();
        deltas.push((job.next_eligible_time - now).num_seconds());
        if let Some(prev) = last {
            assert!(job.next_eligible_time >= prev);
        }
        last = Some(job.next_eligible_time);
        now = job.next_eligible_time;
    }
    assert_eq!(deltas, [120, 240, 480, 960, 1920]);
    let job = q.get("a").unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.attempt_count, 5);
    assert_eq!(job.last_error, Some(throttled()));
}

#[test]
fn terminal_jobs_do_not_change() {
    let q = queue(5);
    add(&q, "a", t0());
    q.claim_next(t0()).unwrap();
    q.record_success("a", t0()).unwrap();
    let before = q.get("a").unwrap();

    assert!(matches!(
        q.record_failure("a", throttled(), t0()),
        Err(QueueError::InvalidTransition { from: JobState::Completed, .. })
    ));
    assert!(matches!(
        q.record_success("a", t0()),
        Err(QueueError::InvalidTransition { .. })
    ));
    assert_eq!(q.get("a").unwrap(), before);
}

#[test]
fn unknown_identifier_is_not_found() {
    let q = queue(5);
    assert_eq!(
        q.record_success("nope", t0()),
        Err(QueueError::NotFound("nope".to_string()))
    );
}

#[test]
fn release_returns_job_to_pending_without_counting() {
    let q = queue(5);
    add(&q, "a", t0());
    q.claim_next(t0()).unwrap();
    q.release("a").unwrap();
    let job = q.get("a").unwrap();
    assert_eq!(job.state, JobState::Pending);
    assert_eq!(job.attempt_count, 0);
    assert!(q.release("a").is_err());
}

#[test]
fn restore_resets_in_progress_jobs() {
    let q = queue(5);
    add(&q, "a", t0());
    add(&q, "b", t0());
    add(&q, "c", t0());
    q.claim_next(t0()).unwrap();
    q.claim_next(t0()).unwrap();
    let snapshot = q.snapshot();
    assert_eq!(q.status_summary().in_progress, 2);

    let restored = JobQueue::new(5, BackoffPolicy::default());
    assert_eq!(restored.restore(snapshot), 2);
    let summary = restored.status_summary();
    assert_eq!(summary.in_progress, 0);
    assert_eq!(summary.pending, 3);
    assert_eq!(summary.total(), 3);
}

#[test]
fn restore_drops_duplicate_identifiers() {
    let q = queue(5);
    add(&q, "a", t0());
    let mut snapshot = q.snapshot();
    let mut dup = snapshot.jobs[0].clone();
    dup.source_reference = "other".to_string();
    snapshot.jobs.push(dup);

    let restored = JobQueue::from_snapshot(snapshot, 5, BackoffPolicy::default());
    assert_eq!(restored.len(), 1);
    assert_eq!(restored.get("a").unwrap().source_reference, "ref:a");
}

#[test]
fn snapshot_survives_checkpoint_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut store: CheckpointStore<QueueSnapshot> = CheckpointStore::new(dir.path().join("queue.json"));
    let q = queue(5);
    add(&q, "a", t0());
    add(&q, "b", t0());
    q.claim_next(t0()).unwrap();
    q.record_failure("a", throttled(), t0()).unwrap();
    let snapshot = q.snapshot();
    store.save(&snapshot).unwrap();

    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded, snapshot);
    let restored = JobQueue::from_snapshot(loaded, 5, BackoffPolicy::default());
    assert_eq!(restored.get("a").unwrap().state, JobState::Retrying);
    assert_eq!(restored.get("b").unwrap().state, JobState::Pending);
}

#[test]
fn concurrent_claims_never_share_a_job() {
    let q = Arc::new(queue(5));
    for i in 0..200 {
        add(&q, &format!("job{i}"), t0());
    }
    let mut handles = Vec::new();
    for _ in 0..8 {
        let q = Arc::clone(&q);
        handles.push(std::thread::spawn(move || {
            let mut mine = Vec::new();
            while let Some(job) = q.claim_next(t0()) {
                mine.push(job.identifier);
            }
            mine
        }));
    }
    let mut all = Vec::new();
    for h in handles {
        all.extend(h.join().unwrap());
    }
    let unique: HashSet<_> = all.iter().cloned().collect();
    assert_eq!(all.len(), 200);
    assert_eq!(unique.len(), 200);
    assert_eq!(q.status_summary().in_progress, 200);
}

#[test]
fn status_helpers() {
    let q = queue(5);
    assert!(q.is_empty());
    assert!(!q.has_unfinished());
    add(&q, "a", t0());
    add(&q, "b", t0());
    assert!(q.has_unfinished());
    q.claim_next(t0()).unwrap();
    q.record_success("a", t0()).unwrap();
    assert_eq!(q.jobs_in_state(JobState::Completed).len(), 1);
    assert_eq!(q.get("a").unwrap().completed_at, Some(t0()));
    assert_eq!(q.status_summary().count(JobState::Pending), 1);
    q.clear();
    assert!(q.is_empty());
}

fn progress() -> ScanProgress {
    let mut p = ScanProgress::new();
    for (source, id) in [("chan-b", "v3"), ("chan-a", "v1"), ("chan-a", "v2"), ("chan-b", "v1")] {
        p.add_item(source, DiscoveredItem::new(id).with_title(format!("title {id}")), t0());
    }
    p
}

#[test]
fn populate_enqueues_in_source_order_with_template() {
    let q = queue(5);
    let report = populate(&q, &progress(), "https://host/watch?v={id}", &HashSet::new(), t0());
    assert_eq!(report.added, 3);
    assert_eq!(report.existing, 1);
    assert_eq!(report.seen(), 4);

    let order: Vec<_> = std::iter::from_fn(|| q.claim_next(t0()))
        .map(|j| j.identifier)
        .collect();
    assert_eq!(order, ["v1", "v2", "v3"]);
    let v1 = q.get("v1").unwrap();
    assert_eq!(v1.source_reference, "https://host/watch?v=v1");
    assert_eq!(v1.origin.as_deref(), Some("chan-a"));
    assert_eq!(v1.title.as_deref(), Some("title v1"));
}

#[test]
fn populate_skips_archived_and_counts_completed() {
    let q = queue(5);
    add(&q, "v2", t0());
    q.claim_next(t0()).unwrap();
    q.record_success("v2", t0()).unwrap();

    let archive: HashSet<String> = ["v3".to_string()].into_iter().collect();
    let report = populate(&q, &progress(), "{id}", &archive, t0());
    assert_eq!(report.added, 1);
    assert_eq!(report.already_completed, 1);
    assert_eq!(report.archived, 1);
    assert_eq!(report.existing, 1);
}
