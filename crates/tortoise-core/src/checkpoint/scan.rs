//! When to flush scan progress.
//!
//! Two triggers: a source finishing (always) and wall-clock time since the
//! last save (when the interval is non-zero). The time trigger bounds the loss
//! window inside a single very large source.

use std::time::{Duration, Instant};

use chrono::Utc;

use super::{CheckpointStore, DiscoveredItem, ScanProgress, StorageError};

/// Default time trigger: five minutes.
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(300);

/// Why a checkpoint was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointTrigger {
    /// A source finished enumeration.
    SourceComplete,
    /// The configured interval elapsed.
    Interval,
    /// Explicit flush (end of run, cancellation).
    Flush,
}

/// Owns [`ScanProgress`] for one run and saves it to a [`CheckpointStore`].
#[derive(Debug)]
pub struct ScanCheckpointer {
    progress: ScanProgress,
    store: CheckpointStore<ScanProgress>,
    interval: Duration,
    last_checkpoint: Instant,
    saves: u64,
    failed_saves: u64,
}

impl ScanCheckpointer {
    /// Start from empty progress. `interval` of zero disables the time trigger.
    pub fn new(store: CheckpointStore<ScanProgress>, interval: Duration, now: Instant) -> Self {
        Self::with_progress(ScanProgress::new(), store, interval, now)
    }

    pub fn with_progress(
        progress: ScanProgress,
        store: CheckpointStore<ScanProgress>,
        interval: Duration,
        now: Instant,
    ) -> Self {
        Self {
            progress,
            store,
            interval,
            last_checkpoint: now,
            saves: 0,
            failed_saves: 0,
        }
    }

    /// Resume from whatever the store holds (or start empty).
    pub fn open(
        store: CheckpointStore<ScanProgress>,
        interval: Duration,
        now: Instant,
    ) -> Result<Self, StorageError> {
        let progress = store.load_or_recover()?.unwrap_or_default();
        if progress.total_items() > 0 {
            tracing::info!(
                sources = progress.sources.len(),
                complete = progress.completed_sources(),
                items = progress.total_items(),
                "resuming scan progress from {}",
                store.path().display()
            );
        }
        Ok(Self::with_progress(progress, store, interval, now))
    }

    pub fn progress(&self) -> &ScanProgress {
        &self.progress
    }

    pub fn saves(&self) -> u64 {
        self.saves
    }

    pub fn failed_saves(&self) -> u64 {
        self.failed_saves
    }

    pub fn last_checkpoint(&self) -> Instant {
        self.last_checkpoint
    }

    /// Append a discovered item, then check the time trigger.
    pub fn record_item(
        &mut self,
        source: &str,
        item: DiscoveredItem,
        now: Instant,
    ) -> Result<Option<CheckpointTrigger>, StorageError> {
        self.progress.add_item(source, item, Utc::now());
        self.maybe_checkpoint(now)
    }

    /// Record a failed attempt at `source`, then check the time trigger.
    pub fn record_error(
        &mut self,
        source: &str,
        message: &str,
        now: Instant,
    ) -> Result<Option<CheckpointTrigger>, StorageError> {
        self.progress.record_error(source, message, Utc::now());
        self.maybe_checkpoint(now)
    }

    /// Mark `source` complete and save unconditionally.
    pub fn complete_source(&mut self, source: &str, now: Instant) -> Result<(), StorageError> {
        self.progress.mark_complete(source, Utc::now());
        self.save(CheckpointTrigger::SourceComplete, now)
    }

    /// Save if the time trigger is enabled and due.
    pub fn maybe_checkpoint(
        &mut self,
        now: Instant,
    ) -> Result<Option<CheckpointTrigger>, StorageError> {
        if self.interval.is_zero() {
            return Ok(None);
        }
        if now.saturating_duration_since(self.last_checkpoint) < self.interval {
            return Ok(None);
        }
        self.save(CheckpointTrigger::Interval, now)?;
        Ok(Some(CheckpointTrigger::Interval))
    }

    /// Save unconditionally.
    pub fn flush(&mut self, now: Instant) -> Result<(), StorageError> {
        self.save(CheckpointTrigger::Flush, now)
    }

    fn save(&mut self, trigger: CheckpointTrigger, now: Instant) -> Result<(), StorageError> {
        match self.store.save(&self.progress) {
            Ok(()) => {
                self.saves += 1;
                self.last_checkpoint = now;
                tracing::debug!(
                    ?trigger,
                    items = self.progress.total_items(),
                    "scan checkpoint written"
                );
                Ok(())
            }
            Err(e) => {
                // last_checkpoint is left alone so the next trigger retries.
                self.failed_saves += 1;
                tracing::error!(?trigger, "scan checkpoint failed: {}", e);
                Err(e)
            }
        }
    }
}
