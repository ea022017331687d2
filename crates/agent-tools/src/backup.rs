//! Bounded cache of pre-modification file contents, enabling rollback.
//!
//! Owned by the orchestrator as a per-session struct; caps are enforced on
//! every [`BackupStore::record`] call rather than by a background timer.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_MAX_PER_FILE: usize = 5;
const DEFAULT_MAX_TOTAL_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// A single captured pre-modification snapshot of a file.
#[derive(Clone, Debug)]
pub struct Backup {
    pub path: PathBuf,
    pub content: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
}

/// In-memory, bounded store of [`Backup`] entries.
pub struct BackupStore {
    entries: Vec<Backup>,
    max_per_file: usize,
    max_total_bytes: usize,
    ttl: Duration,
}

impl Default for BackupStore {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            max_per_file: DEFAULT_MAX_PER_FILE,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            ttl: DEFAULT_TTL,
        }
    }
}

impl BackupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new backup, evicting expired entries first and then
    /// enforcing the per-file and total-byte caps, oldest first.
    pub fn record(&mut self, path: PathBuf, content: Vec<u8>, operation: impl Into<String>, now: DateTime<Utc>) {
        self.evict_expired(now);
        self.entries.push(Backup {
            path: path.clone(),
            content,
            timestamp: now,
            operation: operation.into(),
        });
        self.enforce_per_file_cap(&path);
        self.enforce_total_cap();
    }

    fn evict_expired(&mut self, now: DateTime<Utc>) {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::zero());
        self.entries.retain(|b| now - b.timestamp < ttl);
    }

    fn enforce_per_file_cap(&mut self, path: &Path) {
        let mut indices: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, b)| b.path == path)
            .map(|(i, _)| i)
            .collect();
        while indices.len() > self.max_per_file {
            let oldest = indices.remove(0);
            self.entries.remove(oldest);
            // Removing shifts every later index down by one.
            indices.iter_mut().for_each(|i| {
                if *i > oldest {
                    *i -= 1;
                }
            });
        }
    }

    fn enforce_total_cap(&mut self) {
        while self.total_bytes() > self.max_total_bytes && !self.entries.is_empty() {
            self.entries.remove(0);
        }
    }

    fn total_bytes(&self) -> usize {
        self.entries.iter().map(|b| b.content.len()).sum()
    }

    pub fn latest_for(&self, path: &Path) -> Option<&Backup> {
        self.entries.iter().rev().find(|b| b.path == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_latest_for() {
        let mut store = BackupStore::new();
        let now = Utc::now();
        store.record(PathBuf::from("a.txt"), b"v1".to_vec(), "write_file", now);
        store.record(PathBuf::from("a.txt"), b"v2".to_vec(), "write_file", now);
        let latest = store.latest_for(Path::new("a.txt")).unwrap();
        assert_eq!(latest.content, b"v2");
    }

    #[test]
    fn test_per_file_cap_evicts_oldest() {
        let mut store = BackupStore::new();
        let now = Utc::now();
        for i in 0..8 {
            store.record(
                PathBuf::from("a.txt"),
                format!("v{i}").into_bytes(),
                "write_file",
                now,
            );
        }
        let count = store
            .entries
            .iter()
            .filter(|b| b.path == Path::new("a.txt"))
            .count();
        assert_eq!(count, DEFAULT_MAX_PER_FILE);
        assert_eq!(store.latest_for(Path::new("a.txt")).unwrap().content, b"v7");
    }

    #[test]
    fn test_total_byte_cap_evicts_oldest_globally() {
        let mut store = BackupStore::new();
        store.max_total_bytes = 10;
        let now = Utc::now();
        store.record(PathBuf::from("a.txt"), vec![0u8; 6], "write_file", now);
        store.record(PathBuf::from("b.txt"), vec![0u8; 6], "write_file", now);
        assert!(store.total_bytes() <= 10);
        assert!(store.latest_for(Path::new("a.txt")).is_none());
        assert!(store.latest_for(Path::new("b.txt")).is_some());
    }

    #[test]
    fn test_ttl_evicts_expired_entries() {
        let mut store = BackupStore::new();
        store.ttl = Duration::from_secs(60);
        let old = Utc::now() - chrono::Duration::seconds(120);
        store.record(PathBuf::from("a.txt"), b"stale".to_vec(), "write_file", old);
        let now = Utc::now();
        store.record(PathBuf::from("b.txt"), b"fresh".to_vec(), "write_file", now);
        assert!(store.latest_for(Path::new("a.txt")).is_none());
        assert!(store.latest_for(Path::new("b.txt")).is_some());
    }

    #[test]
    fn test_empty_store_reports_is_empty() {
        let store = BackupStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }
}
