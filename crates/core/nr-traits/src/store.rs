//! Object store trait and related types.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use nr_error::Result;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A stream of object body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// An object returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Object key (full path within the bucket)
    pub key: String,

    /// Size in bytes
    pub size: u64,
}

impl ObjectEntry {
    /// Create a new entry.
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// Trait for object storage backends.
///
/// The reconciler depends on exactly these three operations. Pagination,
/// authentication and retries are the implementation's concern; errors are
/// passed through to callers unchanged.
///
/// # Implementations
///
/// - S3 (and S3-compatible endpoints)
/// - Local folder mirror of a bucket
/// - In-memory store ([`crate::MemoryStore`])
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object under `prefix`, flattened across pages.
    ///
    /// Order is the backend's listing order and must be stable for an
    /// unchanged bucket.
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>>;

    /// Opens an object and returns its body as a stream of chunks.
    async fn read_object(&self, bucket: &str, key: &str) -> Result<ByteStream>;

    /// Gets the size of an object in bytes without reading it.
    async fn object_size(&self, bucket: &str, key: &str) -> Result<u64>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str {
        "object-store"
    }
}

/// Reads a whole object into memory.
pub async fn read_all(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<Bytes> {
    let mut stream = store.read_object(bucket, key).await?;
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}
