//! nr-store-local - Object store over a local mirror of buckets.
//!
//! Objects live at `<root>/<bucket>/<key>`, which is the layout produced by
//! `gsutil rsync` / `aws s3 sync` into per-bucket directories. Listing walks
//! the directory tree and returns keys in lexicographic order, matching what
//! cloud object stores return.

use async_trait::async_trait;
use futures::TryStreamExt;
use nr_error::{NrError, Result, StorageError};
use nr_traits::{ByteStream, ObjectEntry, ObjectStore};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Object store backed by a directory of bucket directories.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory holding one directory per bucket.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        let dir = self.root.join(checked_relative(bucket)?);
        if !dir.is_dir() {
            return Err(StorageError::BucketNotFound(bucket.to_string()).into());
        }
        Ok(dir)
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        Ok(self.bucket_dir(bucket)?.join(checked_relative(key)?))
    }
}

/// Reject keys that would resolve outside the bucket directory.
fn checked_relative(key: &str) -> Result<&Path> {
    let path = Path::new(key);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if escapes || key.is_empty() {
        return Err(StorageError::AccessDenied(format!("key '{key}' escapes the store root")).into());
    }
    Ok(path)
}

fn io_error(bucket: &str, key: &str, err: std::io::Error) -> NrError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
        .into()
    } else {
        StorageError::Request {
            operation: "read".to_string(),
            message: format!("{bucket}/{key}: {err}"),
        }
        .into()
    }
}

/// Walk `start` recursively, collecting `(key, size)` for every file.
async fn walk(bucket_dir: &Path, start: PathBuf) -> std::io::Result<Vec<ObjectEntry>> {
    let mut entries = Vec::new();
    let mut pending = vec![start];

    while let Some(dir) = pending.pop() {
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        while let Some(entry) = read_dir.next_entry().await? {
            let file_type = entry.file_type().await?;
            let path = entry.path();

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                let Ok(relative) = path.strip_prefix(bucket_dir) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let size = entry.metadata().await?.len();
                entries.push(ObjectEntry::new(key, size));
            }
        }
    }

    Ok(entries)
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let bucket_dir = self.bucket_dir(bucket)?;

        // Only walk the deepest directory fully named by the prefix
        let start = match prefix.rfind('/') {
            Some(pos) if pos > 0 => bucket_dir.join(checked_relative(&prefix[..pos])?),
            _ => bucket_dir.clone(),
        };

        let mut entries: Vec<ObjectEntry> = walk(&bucket_dir, start)
            .await
            .map_err(|e| io_error(bucket, prefix, e))?
            .into_iter()
            .filter(|e| e.key.starts_with(prefix))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        debug!(bucket, prefix, objects = entries.len(), "Listed local objects");
        Ok(entries)
    }

    async fn read_object(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        let path = self.object_path(bucket, key)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| io_error(bucket, key, e))?;

        let bucket = bucket.to_string();
        let key = key.to_string();
        let stream = ReaderStream::new(file).map_err(move |e| io_error(&bucket, &key, e));
        Ok(Box::pin(stream))
    }

    async fn object_size(&self, bucket: &str, key: &str) -> Result<u64> {
        let path = self.object_path(bucket, key)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error(bucket, key, e))?;

        if !metadata.is_file() {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
            .into());
        }
        Ok(metadata.len())
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nr_traits::read_all;
    use std::fs;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, LocalStore) {
        let temp_dir = TempDir::new().unwrap();
        let bucket = temp_dir.path().join("ingest");
        for (key, body) in [
            ("rel1/release_date.txt", "2022-04-03\n"),
            ("rel1/gene/created/0000", "{}\n{}\n"),
            ("rel1/gene/created/0001", "{}\n"),
            ("rel10/release_date.txt", "2022-04-13\n"),
            ("notes.txt", "hello"),
        ] {
            let path = bucket.join(key);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        let store = LocalStore::new(temp_dir.path());
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_list_keys_sorted_under_prefix() {
        let (_temp_dir, store) = setup_store();
        let entries = store.list_keys("ingest", "rel1/").await.unwrap();

        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "rel1/gene/created/0000",
                "rel1/gene/created/0001",
                "rel1/release_date.txt"
            ]
        );
        assert_eq!(entries[0].size, 6);
    }

    #[tokio::test]
    async fn test_partial_segment_prefix_matches_like_s3() {
        let (_temp_dir, store) = setup_store();
        let entries = store.list_keys("ingest", "rel1").await.unwrap();
        assert_eq!(entries.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_prefix_lists_nothing() {
        let (_temp_dir, store) = setup_store();
        let entries = store.list_keys("ingest", "rel9/").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_read_and_size() {
        let (_temp_dir, store) = setup_store();
        let body = read_all(&store, "ingest", "rel1/release_date.txt")
            .await
            .unwrap();
        assert_eq!(&body[..], b"2022-04-03\n");
        assert_eq!(
            store
                .object_size("ingest", "rel1/release_date.txt")
                .await
                .unwrap(),
            11
        );
    }

    #[tokio::test]
    async fn test_missing_object_and_bucket() {
        let (_temp_dir, store) = setup_store();
        assert!(matches!(
            store.object_size("ingest", "rel1/missing").await,
            Err(NrError::Storage(StorageError::NotFound { .. }))
        ));
        assert!(matches!(
            store.list_keys("other", "").await,
            Err(NrError::Storage(StorageError::BucketNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let (_temp_dir, store) = setup_store();
        assert!(matches!(
            store.object_size("ingest", "../ingest/notes.txt").await,
            Err(NrError::Storage(StorageError::AccessDenied(_)))
        ));
    }
}
