//! Statistics for reconciliation runs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected while locating releases and counting records.
///
/// Shared between the classifier, the record counter and the reconciler, so
/// every counter is atomic.
#[derive(Debug)]
pub struct ReconcileStats {
    /// When the run started
    started_at: DateTime<Utc>,

    /// Keys returned by listings
    keys_listed: AtomicU64,

    /// Keys classified as excluded
    keys_excluded: AtomicU64,

    /// Notifications successfully built
    releases_built: AtomicU64,

    /// Releases that could not be built
    releases_failed: AtomicU64,

    /// Notification pairs that matched
    pairs_matched: AtomicU64,

    /// Notification pairs that did not match
    pairs_mismatched: AtomicU64,

    /// Files whose lines were counted
    files_counted: AtomicU64,

    /// Non-empty lines counted
    lines_counted: AtomicU64,

    /// Counts served from the memo or local cache
    cache_hits: AtomicU64,

    /// Bytes downloaded into the local cache
    bytes_downloaded: AtomicU64,
}

impl Default for ReconcileStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcileStats {
    /// Create a new stats tracker starting now.
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            keys_listed: AtomicU64::new(0),
            keys_excluded: AtomicU64::new(0),
            releases_built: AtomicU64::new(0),
            releases_failed: AtomicU64::new(0),
            pairs_matched: AtomicU64::new(0),
            pairs_mismatched: AtomicU64::new(0),
            files_counted: AtomicU64::new(0),
            lines_counted: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            bytes_downloaded: AtomicU64::new(0),
        }
    }

    pub fn record_listed(&self, keys: u64) {
        self.keys_listed.fetch_add(keys, Ordering::Relaxed);
    }

    pub fn record_excluded(&self) {
        self.keys_excluded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_release_built(&self) {
        self.releases_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_release_failed(&self) {
        self.releases_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pair(&self, matched: bool) {
        if matched {
            self.pairs_matched.fetch_add(1, Ordering::Relaxed);
        } else {
            self.pairs_mismatched.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_file_counted(&self, lines: u64) {
        self.files_counted.fetch_add(1, Ordering::Relaxed);
        self.lines_counted.fetch_add(lines, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_download(&self, bytes: u64) {
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Time elapsed since the run started.
    pub fn elapsed(&self) -> Duration {
        Utc::now() - self.started_at
    }

    /// Take a serializable snapshot of the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            started_at: self.started_at,
            duration_ms: self.elapsed().num_milliseconds().max(0) as u64,
            keys_listed: self.keys_listed.load(Ordering::Relaxed),
            keys_excluded: self.keys_excluded.load(Ordering::Relaxed),
            releases_built: self.releases_built.load(Ordering::Relaxed),
            releases_failed: self.releases_failed.load(Ordering::Relaxed),
            pairs_matched: self.pairs_matched.load(Ordering::Relaxed),
            pairs_mismatched: self.pairs_mismatched.load(Ordering::Relaxed),
            files_counted: self.files_counted.load(Ordering::Relaxed),
            lines_counted: self.lines_counted.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ReconcileStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub keys_listed: u64,
    pub keys_excluded: u64,
    pub releases_built: u64,
    pub releases_failed: u64,
    pub pairs_matched: u64,
    pub pairs_mismatched: u64,
    pub files_counted: u64,
    pub lines_counted: u64,
    pub cache_hits: u64,
    pub bytes_downloaded: u64,
}

impl StatsSnapshot {
    /// Whether any release failed to build or any pair mismatched.
    pub fn has_failures(&self) -> bool {
        self.releases_failed > 0 || self.pairs_mismatched > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = ReconcileStats::new();
        stats.record_listed(5);
        stats.record_excluded();
        stats.record_release_built();
        stats.record_pair(true);
        stats.record_pair(false);
        stats.record_file_counted(10);
        stats.record_file_counted(2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.keys_listed, 5);
        assert_eq!(snapshot.keys_excluded, 1);
        assert_eq!(snapshot.releases_built, 1);
        assert_eq!(snapshot.pairs_matched, 1);
        assert_eq!(snapshot.pairs_mismatched, 1);
        assert_eq!(snapshot.files_counted, 2);
        assert_eq!(snapshot.lines_counted, 12);
        assert!(snapshot.has_failures());
    }

    #[test]
    fn test_fresh_stats_have_no_failures() {
        assert!(!ReconcileStats::new().snapshot().has_failures());
    }
}
