//! Memo of per-object record counts.
//!
//! Owned by the caller and injected into the record counter, so repeated
//! counts of the same object within a run are served from memory and the
//! state can be inspected or reset.

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::trace;

/// Thread-safe map of `(bucket, key)` to non-empty line count.
#[derive(Debug, Default)]
pub struct CountMemo {
    counts: RwLock<HashMap<(String, String), u64>>,
}

impl CountMemo {
    /// Create an empty memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a memoized count.
    pub fn get(&self, bucket: &str, key: &str) -> Option<u64> {
        let counts = self.counts.read().ok()?;
        let count = counts
            .get(&(bucket.to_string(), key.to_string()))
            .copied();
        if count.is_some() {
            trace!(bucket, key, "Count memo hit");
        }
        count
    }

    /// Memoize a count.
    pub fn insert(&self, bucket: &str, key: &str, count: u64) {
        let Ok(mut counts) = self.counts.write() else {
            return; // Lock poisoned, skip memoizing
        };
        counts.insert((bucket.to_string(), key.to_string()), count);
    }

    /// Forget every count.
    pub fn clear(&self) {
        if let Ok(mut counts) = self.counts.write() {
            counts.clear();
        }
    }

    /// Number of memoized objects.
    pub fn len(&self) -> usize {
        self.counts.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Whether the memo is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
