//! Audit log of keys that do not belong to any release.
//!
//! Exclusion is a normal classification outcome, so sinks never fail the
//! caller: write errors are logged and dropped.

use nr_error::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Destination for excluded keys.
pub trait ExclusionSink: Send + Sync {
    /// Record one excluded key occurrence.
    fn record(&self, key: &str);
}

/// Append-only text log, one `excluded blob: <key>` line per occurrence.
#[derive(Debug)]
pub struct FileExclusionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileExclusionLog {
    /// Open (or create) the log for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExclusionSink for FileExclusionLog {
    fn record(&self, key: &str) {
        let mut file = self.file.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!(path = %self.path.display(), key, "Exclusions log lock poisoned, writing anyway");
            poisoned.into_inner()
        });
        if let Err(e) = writeln!(file, "excluded blob: {key}") {
            warn!(path = %self.path.display(), key, error = %e, "Failed to append to exclusions log");
        }
    }
}

/// Keeps excluded keys in memory.
#[derive(Debug, Default)]
pub struct MemoryExclusionLog {
    keys: Mutex<Vec<String>>,
}

impl MemoryExclusionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys recorded so far, in order.
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().map(|k| k.clone()).unwrap_or_default()
    }
}

impl ExclusionSink for MemoryExclusionLog {
    fn record(&self, key: &str) {
        if let Ok(mut keys) = self.keys.lock() {
            keys.push(key.to_string());
        }
    }
}

/// Discards exclusions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExclusionLog;

impl ExclusionSink for NoopExclusionLog {
    fn record(&self, _key: &str) {}
}
