//! Opening the persisted queue and scan documents named by the config.

use anyhow::{Context, Result};
use std::sync::Arc;
use tortoise_core::checkpoint::{CheckpointStore, ScanProgress};
use tortoise_core::classify::{ErrorClassifier, ErrorLog};
use tortoise_core::config::TortoiseConfig;
use tortoise_core::control::RunControl;
use tortoise_core::orchestrator::Orchestrator;
use tortoise_core::queue::{JobQueue, QueueSnapshot};

pub struct QueueState {
    pub queue: Arc<JobQueue>,
    pub store: CheckpointStore<QueueSnapshot>,
}

/// Load the queue snapshot (or start empty). Jobs a crashed run left in
/// progress come back as pending.
pub fn open_queue(cfg: &TortoiseConfig) -> Result<QueueState> {
    let path = cfg.queue_path()?;
    let store = CheckpointStore::new(&path);
    let snapshot = store
        .load_or_recover()
        .with_context(|| format!("loading queue from {}", path.display()))?;
    let queue = match snapshot {
        Some(s) => JobQueue::from_snapshot(s, cfg.queue.max_attempts, cfg.job_backoff()),
        None => JobQueue::new(cfg.queue.max_attempts, cfg.job_backoff()),
    };
    Ok(QueueState {
        queue: Arc::new(queue),
        store,
    })
}

pub fn scan_store(cfg: &TortoiseConfig) -> Result<CheckpointStore<ScanProgress>> {
    Ok(CheckpointStore::new(cfg.scan_path()?))
}

/// Orchestrator for one run, cancelled by Ctrl-C.
pub fn orchestrator(cfg: &TortoiseConfig) -> Result<Orchestrator> {
    let classifier = ErrorClassifier::new().with_error_log(ErrorLog::new(cfg.error_log_path()?));
    let control = RunControl::new();
    control.cancel_on_ctrl_c();
    Ok(Orchestrator::new(
        Arc::new(cfg.collaborator()),
        cfg.pacing_controller(),
        classifier,
        control,
    )
    .with_jitter(cfg.pacing.jitter_fraction))
}
