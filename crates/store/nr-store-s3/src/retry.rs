//! Retry policy for S3 requests.
//!
//! Listing, head and get requests are retried with exponential backoff when
//! the failure looks transient (throttling, 5xx, dropped connections).
//! Missing objects and permission failures are returned immediately.

use nr_error::{NrError, StorageError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Message fragments of failures worth retrying.
const TRANSIENT_MARKERS: &[&str] = &[
    "slowdown",
    "toomanyrequests",
    "throttl",
    "service unavailable",
    "internalerror",
    "500",
    "502",
    "503",
    "504",
    "timeout",
    "timed out",
    "connection reset",
    "connection refused",
    "dispatch failure",
];

/// Message fragments of failures that will not go away on retry.
const PERMANENT_MARKERS: &[&str] = &[
    "nosuchkey",
    "nosuchbucket",
    "accessdenied",
    "invalidrequest",
    "invalidaccesskeyid",
    "signaturedoesnotmatch",
    "400",
    "403",
    "404",
];

/// How S3 requests are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,

    /// Upper bound on the delay, before jitter
    pub max_delay: Duration,

    /// Add up to 25% random delay so concurrent readers spread out
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never retry.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay));

        if !self.jitter {
            return delay;
        }
        let spread = delay.as_millis() as u64 / 4;
        delay + Duration::from_millis(rand::rng().random_range(0..=spread))
    }
}

/// Whether a failed request may succeed if repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    Retryable,
    NonRetryable,
}

/// Classify an SDK error message.
///
/// Messages matching neither marker list are treated as retryable, since
/// the SDK reports most network failures without a status code.
pub fn classify_message(message: &str) -> ErrorClassification {
    let lower = message.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has(TRANSIENT_MARKERS) {
        ErrorClassification::Retryable
    } else if has(PERMANENT_MARKERS) {
        ErrorClassification::NonRetryable
    } else {
        ErrorClassification::Retryable
    }
}

/// Classify a store error.
///
/// Only request failures and interrupted bodies are candidates for retry.
pub fn classify_error(error: &NrError) -> ErrorClassification {
    match error {
        NrError::Storage(StorageError::Request { message, .. }) => classify_message(message),
        NrError::Storage(StorageError::Body { .. }) => ErrorClassification::Retryable,
        _ => ErrorClassification::NonRetryable,
    }
}

/// Run `operation` until it succeeds, fails permanently, or the retry
/// budget in `config` is spent. The last error is returned.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, NrError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NrError>>,
{
    let mut retry = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if classify_error(&err) == ErrorClassification::NonRetryable {
            debug!(operation = operation_name, error = %err, "Request failed permanently");
            return Err(err);
        }
        if retry >= config.max_retries {
            warn!(
                operation = operation_name,
                attempts = retry + 1,
                error = %err,
                "Retries exhausted"
            );
            return Err(err);
        }

        let delay = config.delay_for(retry);
        warn!(
            operation = operation_name,
            retry,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Transient S3 error, retrying"
        );
        sleep(delay).await;
        retry += 1;
    }
}
