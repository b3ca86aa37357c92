//! Mapping of SDK errors onto the storage error taxonomy.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use nr_error::{NrError, StorageError};

/// Convert an SDK error into a [`StorageError`].
///
/// A 404 becomes `NotFound` for object operations and `BucketNotFound` for
/// listings; a 403 becomes `AccessDenied`. Everything else keeps the full SDK
/// error chain in its message.
pub(crate) fn storage_error<E>(
    operation: &str,
    bucket: &str,
    key: Option<&str>,
    err: SdkError<E, HttpResponse>,
) -> NrError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let message = DisplayErrorContext(&err).to_string();

    let error = match (status, key) {
        (Some(404), Some(key)) => StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        },
        (Some(404), None) => StorageError::BucketNotFound(bucket.to_string()),
        (Some(403), _) => StorageError::AccessDenied(format!("{operation} s3://{bucket}: {message}")),
        _ => StorageError::Request {
            operation: operation.to_string(),
            message,
        },
    };

    error.into()
}
