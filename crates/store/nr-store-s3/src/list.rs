//! S3 object listing with pagination support.

use async_stream::try_stream;
use aws_sdk_s3::Client;
use futures::Stream;
use nr_error::Result;
use nr_traits::ObjectEntry;

use crate::error::storage_error;
use crate::retry::{RetryConfig, with_retry};

/// List objects in an S3 bucket under a prefix.
///
/// Returns a stream of [`ObjectEntry`] items in S3 key order, handling
/// pagination automatically. Each page request is retried on transient
/// failures. Directory markers (keys ending with `/`) are skipped.
///
/// # Example
///
/// ```ignore
/// use futures::{StreamExt, pin_mut};
///
/// let stream = list_objects(&client, &retry, "my-bucket", "rel1/");
/// pin_mut!(stream);
///
/// while let Some(result) = stream.next().await {
///     let obj = result?;
///     println!("Found: {} ({} bytes)", obj.key, obj.size);
/// }
/// ```
pub fn list_objects<'a>(
    client: &'a Client,
    retry: &'a RetryConfig,
    bucket: &'a str,
    prefix: &'a str,
) -> impl Stream<Item = Result<ObjectEntry>> + 'a {
    try_stream! {
        let mut continuation_token: Option<String> = None;

        loop {
            let token = continuation_token.clone();
            let resp = with_retry(retry, "list_objects_v2", || {
                let request = client
                    .list_objects_v2()
                    .bucket(bucket)
                    .prefix(prefix)
                    .set_continuation_token(token.clone())
                    .send();
                async move {
                    request
                        .await
                        .map_err(|e| storage_error("list_objects_v2", bucket, None, e))
                }
            })
            .await?;

            for obj in resp.contents() {
                let key = obj.key().unwrap_or_default();

                if key.is_empty() || key.ends_with('/') {
                    continue;
                }

                yield ObjectEntry::new(key, obj.size().unwrap_or(0).max(0) as u64);
            }

            if resp.is_truncated() == Some(true) {
                continuation_token = resp.next_continuation_token().map(str::to_string);
                if continuation_token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }
    }
}
