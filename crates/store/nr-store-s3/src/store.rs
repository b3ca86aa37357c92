//! [`ObjectStore`] implementation over an S3 client.

use async_stream::try_stream;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use nr_error::{Result, StorageError};
use nr_traits::{ByteStream, ObjectEntry, ObjectStore};
use tracing::debug;

use crate::client::{S3Config, create_s3_client};
use crate::error::storage_error;
use crate::list::list_objects;
use crate::retry::{RetryConfig, with_retry};

/// Object store backed by S3 or an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    retry: RetryConfig,
}

impl S3Store {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryConfig::default(),
        }
    }

    /// Build a client from configuration and wrap it.
    pub async fn from_config(config: &S3Config) -> Result<Self> {
        Ok(Self::new(create_s3_client(config).await?))
    }

    /// Set the retry policy applied to every request.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The underlying SDK client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let stream = list_objects(&self.client, &self.retry, bucket, prefix);
        pin_mut!(stream);

        let mut entries = Vec::new();
        while let Some(entry) = stream.next().await {
            entries.push(entry?);
        }

        debug!(bucket, prefix, objects = entries.len(), "Listed S3 objects");
        Ok(entries)
    }

    async fn read_object(&self, bucket: &str, key: &str) -> Result<ByteStream> {
        let output = with_retry(&self.retry, "get_object", || {
            let request = self.client.get_object().bucket(bucket).key(key).send();
            async move {
                request
                    .await
                    .map_err(|e| storage_error("get_object", bucket, Some(key), e))
            }
        })
        .await?;

        Ok(Box::pin(body_stream(key.to_string(), output.body)))
    }

    async fn object_size(&self, bucket: &str, key: &str) -> Result<u64> {
        let head = with_retry(&self.retry, "head_object", || {
            let request = self.client.head_object().bucket(bucket).key(key).send();
            async move {
                request
                    .await
                    .map_err(|e| storage_error("head_object", bucket, Some(key), e))
            }
        })
        .await?;

        let size = head.content_length().ok_or_else(|| StorageError::Request {
            operation: "head_object".to_string(),
            message: format!("no content length for s3://{bucket}/{key}"),
        })?;

        Ok(size.max(0) as u64)
    }

    fn backend(&self) -> &'static str {
        "s3"
    }
}

/// Adapt an SDK body into a chunk stream, tagging failures with the key.
fn body_stream(
    key: String,
    mut body: aws_sdk_s3::primitives::ByteStream,
) -> impl Stream<Item = Result<Bytes>> + Send {
    try_stream! {
        while let Some(bytes) = body.try_next().await.map_err(|e| StorageError::Body {
            key: key.clone(),
            message: e.to_string(),
        })? {
            yield bytes;
        }
    }
}
