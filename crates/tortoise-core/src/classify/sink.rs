//! Append-only error log: one line per recorded failure.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;

use super::ErrorRecord;

/// Writes `[timestamp] [category] identifier: message` lines. Never rotated.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format_line(record: &ErrorRecord) -> String {
        let message = record.message.replace(&['\r', '\n'][..], " ");
        format!(
            "[{}] [{}] {}: {}",
            record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            record.category,
            record.identifier,
            message
        )
    }

    pub fn append(&self, record: &ErrorRecord) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{}", Self::format_line(record))
    }
}
