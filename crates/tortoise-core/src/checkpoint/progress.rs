//! Accumulated enumeration results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One content identifier found while enumerating a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl DiscoveredItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Per-source progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProgress {
    /// Discovered items in discovery order, without duplicates.
    #[serde(default)]
    pub items: Vec<DiscoveredItem>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SourceProgress {
    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id == id)
    }
}

/// Everything an enumeration run has collected so far, keyed by source locator.
///
/// Only ever grows: items are appended and sources are marked complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    #[serde(default = "default_version")]
    pub version: u8,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceProgress>,
}

fn default_version() -> u8 {
    1
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanProgress {
    pub fn new() -> Self {
        Self {
            version: 1,
            sources: BTreeMap::new(),
        }
    }

    pub fn source(&self, source: &str) -> Option<&SourceProgress> {
        self.sources.get(source)
    }

    pub fn is_complete(&self, source: &str) -> bool {
        self.sources.get(source).map(|s| s.complete).unwrap_or(false)
    }

    /// Append `item` under `source` unless it is already there. Returns true
    /// if the item was new.
    pub fn add_item(&mut self, source: &str, item: DiscoveredItem, now: DateTime<Utc>) -> bool {
        let entry = self.sources.entry(source.to_string()).or_default();
        entry.updated_at = Some(now);
        if entry.contains(&item.id) {
            return false;
        }
        entry.items.push(item);
        true
    }

    pub fn mark_complete(&mut self, source: &str, now: DateTime<Utc>) {
        let entry = self.sources.entry(source.to_string()).or_default();
        entry.complete = true;
        entry.last_error = None;
        entry.updated_at = Some(now);
    }

    /// Note why the last attempt at `source` failed. The source stays
    /// incomplete so the next run enumerates it again.
    pub fn record_error(&mut self, source: &str, message: &str, now: DateTime<Utc>) {
        let entry = self.sources.entry(source.to_string()).or_default();
        entry.last_error = Some(message.to_string());
        entry.updated_at = Some(now);
    }

    pub fn total_items(&self) -> usize {
        self.sources.values().map(|s| s.items.len()).sum()
    }

    pub fn completed_sources(&self) -> usize {
        self.sources.values().filter(|s| s.complete).count()
    }
}
