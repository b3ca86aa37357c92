//! Local on-disk cache of downloaded objects.
//!
//! A cached copy is keyed by object key and is valid only while its size
//! equals the remote object's size. Downloads go to a `.part` sibling and are
//! renamed into place once complete, so a partial copy is never served.
//! Fetches of the same key are serialized; the second caller finds the
//! first caller's copy.

use futures::StreamExt;
use nr_error::{CacheError, Result};
use nr_traits::ObjectStore;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Number of downloads attempted before giving up on a size mismatch.
const DOWNLOAD_ATTEMPTS: usize = 2;

/// Object cache rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectCache {
    root: PathBuf,
    key_locks: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

/// Result of [`LocalObjectCache::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedObject {
    /// Local path of the cached copy
    pub path: PathBuf,

    /// Size in bytes, equal to the remote size
    pub size: u64,

    /// Whether an existing copy was reused
    pub reused: bool,
}

impl LocalObjectCache {
    /// Create a cache storing objects under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            key_locks: Arc::default(),
        }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for an object key.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(CacheError::InvalidKey(key.to_string()).into());
        }
        Ok(self.root.join(relative))
    }

    /// Make sure a complete copy of `key` is cached and return its path.
    ///
    /// A stale copy (size differs from the remote) is deleted and downloaded
    /// again. A download that comes out short is deleted and fetched once
    /// more before failing with [`CacheError::SizeMismatch`].
    pub async fn fetch(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
    ) -> Result<CachedObject> {
        let path = self.path_for(key)?;
        let key_lock = self.key_lock(&path);
        let _guard = key_lock.lock().await;

        let expected = store.object_size(bucket, key).await?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() == expected => {
                debug!(key, path = %path.display(), "Reusing cached object");
                return Ok(CachedObject {
                    path,
                    size: expected,
                    reused: true,
                });
            }
            Ok(meta) if meta.is_file() => {
                debug!(key, cached = meta.len(), expected, "Removing stale cached object");
                tokio::fs::remove_file(&path).await?;
            }
            _ => {}
        }

        let mut actual = 0;
        for attempt in 1..=DOWNLOAD_ATTEMPTS {
            info!(key, attempt, path = %path.display(), "Downloading object");
            actual = self.download(store, bucket, key, &path).await?;
            if actual == expected {
                return Ok(CachedObject {
                    path,
                    size: actual,
                    reused: false,
                });
            }

            warn!(key, attempt, expected, actual, "Downloaded object has the wrong size");
            tokio::fs::remove_file(&path).await?;
        }

        Err(CacheError::SizeMismatch {
            key: key.to_string(),
            expected,
            actual,
        }
        .into())
    }

    fn key_lock(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    async fn download(
        &self,
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<u64> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut part_name = path.as_os_str().to_owned();
        part_name.push(".part");
        let part = PathBuf::from(part_name);

        let mut body = store.read_object(bucket, key).await?;
        let mut file = tokio::fs::File::create(&part).await?;
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&part).await;
                    return Err(e);
                }
            };
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&part, path).await?;
        Ok(written)
    }
}
