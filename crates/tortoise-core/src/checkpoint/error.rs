//! Storage failures raised by the checkpoint store.

use std::path::PathBuf;

/// A checkpoint could not be read or written. Writes that fail this way leave
/// the previous snapshot untouched.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("create checkpoint dir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("back up {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialize checkpoint: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("write checkpoint {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("replace checkpoint {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("read checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse checkpoint {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
