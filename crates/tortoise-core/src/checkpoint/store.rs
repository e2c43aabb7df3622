//! Atomic JSON snapshot persistence.

use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use super::StorageError;

/// Suffix of the copy of the previous snapshot taken before the first write.
pub const BACKUP_SUFFIX: &str = ".backup";

/// Path for the backup: appends `.backup` (e.g. `queue.json` → `queue.json.backup`).
pub fn backup_path(path: &Path) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(BACKUP_SUFFIX);
    PathBuf::from(o)
}

/// Single-writer, rename-atomic store for one snapshot document.
///
/// A reader sees either the previous complete snapshot or the new one. Two
/// processes must not share a path; nothing here locks against that.
#[derive(Debug)]
pub struct CheckpointStore<T> {
    path: PathBuf,
    backed_up: bool,
    _snapshot: PhantomData<fn() -> T>,
}

impl<T> CheckpointStore<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backed_up: false,
            _snapshot: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        backup_path(&self.path)
    }

    /// Write `snapshot`: serialize into a temp file next to the target, fsync,
    /// then rename over the target. The first save of a store copies any
    /// existing target to `<name>.backup` beforehand.
    pub fn save(&mut self, snapshot: &T) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        if !self.backed_up {
            if self.path.exists() {
                let backup = self.backup_path();
                std::fs::copy(&self.path, &backup)
                    .map_err(|source| StorageError::Backup { path: backup, source })?;
            }
            self.backed_up = true;
        }

        let json = serde_json::to_vec_pretty(snapshot).map_err(StorageError::Serialize)?;

        // The temp file is removed on drop if we bail before `persist`.
        let write_err = |source: std::io::Error| StorageError::Write {
            path: self.path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(&json).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path)
            .map_err(|e| StorageError::Persist {
                path: self.path.clone(),
                source: e.error,
            })?;
        tracing::debug!(path = %self.path.display(), bytes = json.len(), "checkpoint saved");
        Ok(())
    }

    /// Read the snapshot, or `None` if nothing has been saved yet.
    pub fn load(&self) -> Result<Option<T>, StorageError> {
        read_snapshot(&self.path)
    }

    /// Like [`load`](Self::load), but falls back to the backup when the main
    /// document is unreadable or corrupt.
    pub fn load_or_recover(&self) -> Result<Option<T>, StorageError> {
        match self.load() {
            Ok(v) => Ok(v),
            Err(e) => {
                let backup = self.backup_path();
                tracing::warn!("{}; trying {}", e, backup.display());
                match read_snapshot(&backup) {
                    Ok(Some(v)) => Ok(Some(v)),
                    _ => Err(e),
                }
            }
        }
    }
}

fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}
