//! In-memory object store.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use nr_error::{Result, StorageError};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::store::{ByteStream, ObjectEntry, ObjectStore};

/// Object store backed by in-memory maps.
///
/// Keys list in lexicographic order, like S3 and GCS. Bodies can be split into
/// small chunks to exercise stream consumers across chunk boundaries.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, Bytes>>>,
    chunk_size: Option<usize>,
    reads: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split object bodies into chunks of at most `chunk_size` bytes.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size.max(1));
        self
    }

    /// Create a bucket with no objects.
    pub fn create_bucket(&self, bucket: &str) {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets.entry(bucket.to_string()).or_default();
        }
    }

    /// Store an object, creating the bucket if needed.
    pub fn put(&self, bucket: &str, key: &str, body: impl Into<Bytes>) {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets
                .entry(bucket.to_string())
                .or_default()
                .insert(key.to_string(), body.into());
        }
    }

    /// Remove an object.
    pub fn remove(&self, bucket: &str, key: &str) -> bool {
        self.buckets
            .write()
            .ok()
            .and_then(|mut buckets| buckets.get_mut(bucket).and_then(|b| b.remove(key)))
            .is_some()
    }

    /// Number of `read_object` calls served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let buckets = self
            .buckets
            .read()
            .map_err(|_| StorageError::Request {
                operation: "get".to_string(),
                message: "store lock poisoned".to_string(),
            })?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        objects.get(key).cloned().ok_or_else(|| {
            StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let buckets = self
            .buckets
            .read()
            .map_err(|_| StorageError::Request {
                operation: "list".to_string(),
                message: "store lock poisoned".to_string(),
            })?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;

        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, body)| ObjectEntry::new(key.clone(), body.len() as u64))
            .collect())
    }

    async fn read_object(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        let body = self.get(bucket, key)?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        let chunks: Vec<Result<Bytes>> = match self.chunk_size {
            Some(size) if !body.is_empty() => (0..body.len())
                .step_by(size)
                .map(|start| Ok(body.slice(start..(start + size).min(body.len()))))
                .collect(),
            _ => vec![Ok(body)],
        };

        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn object_size(&self, bucket: &str, key: &str) -> Result<u64> {
        Ok(self.get(bucket, key)?.len() as u64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
