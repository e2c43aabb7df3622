//! Durable progress snapshots.
//!
//! [`CheckpointStore`] persists any serde-serializable snapshot as JSON with
//! temp-file + rename atomicity and a `.backup` copy of the prior snapshot.
//! [`ScanCheckpointer`] decides when a long enumeration flushes its
//! [`ScanProgress`] to a store.

mod error;
mod progress;
mod scan;
mod store;

pub use error::StorageError;
pub use progress::{DiscoveredItem, ScanProgress, SourceProgress};
pub use scan::{CheckpointTrigger, ScanCheckpointer, DEFAULT_CHECKPOINT_INTERVAL};
pub use store::{backup_path, CheckpointStore, BACKUP_SUFFIX};
