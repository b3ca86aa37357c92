//! Error types and classification for the release notification reconciler.
//!
//! This crate provides:
//! - [`NrError`] - Top-level error enum for all reconciliation errors
//! - Domain-specific errors ([`StorageError`], [`ReleaseError`], [`MismatchError`],
//!   [`CacheError`], [`FormatError`])
//! - [`NotificationMismatch`] - Structured cause of a failed notification comparison
//! - [`ErrorScope`] for deciding how much of a batch an error invalidates

use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the reconciler.
#[derive(Error, Debug)]
pub enum NrError {
    /// Object storage errors (listing, reading, sizing)
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Release layout errors (markers, empty prefixes, mapping dates)
    #[error("Release error: {0}")]
    Release(#[from] ReleaseError),

    /// Reconciliation failures
    #[error("Reconciliation failed: {0}")]
    Mismatch(#[from] MismatchError),

    /// Local object cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Mapping, notification or report file format errors
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for NrError {
    fn from(error: serde_json::Error) -> Self {
        Self::Format(FormatError::Json(error))
    }
}

impl From<NotificationMismatch> for NrError {
    fn from(mismatch: NotificationMismatch) -> Self {
        Self::Mismatch(MismatchError::Notification(mismatch))
    }
}

/// Object storage errors.
///
/// These are surfaced to callers as-is; the reconciler never reinterprets them.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Object does not exist
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Bucket does not exist
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// Access denied
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// A storage request failed
    #[error("{operation} failed: {message}")]
    Request { operation: String, message: String },

    /// Reading an object body failed part way through
    #[error("Failed reading body of {key}: {message}")]
    Body { key: String, message: String },
}

/// Release layout errors.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Zero or more than one `release_date.txt` marker under a prefix
    #[error("Expected exactly one release marker under '{prefix}', found {found}: {markers:?}")]
    AmbiguousReleaseMarker {
        prefix: String,
        found: usize,
        markers: Vec<String>,
    },

    /// The prefix listed no objects at all
    #[error("No objects found under release prefix '{prefix}'")]
    EmptyRelease { prefix: String },

    /// The marker content disagrees with the release date in the mapping file
    #[error(
        "Release date read from '{prefix}' ({generated}) does not match the mapping ({mapped})"
    )]
    MappingDateMismatch {
        prefix: String,
        mapped: String,
        generated: String,
    },

    /// No notification with this release date
    #[error("No notification #{occurrence} with release date {release_date}")]
    UnknownReleaseDate {
        release_date: String,
        occurrence: usize,
    },
}

/// Structured cause of a failed notification comparison.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationMismatch {
    /// `release_date` fields differ
    #[error("Release date mismatch: expected {expected}, generated {actual}")]
    ReleaseDateMismatch { expected: String, actual: String },

    /// The expected notification's files do not all live under one directory
    #[error("Files do not all start with prefix '{prefix}': {offending:?}")]
    PrefixInconsistency {
        prefix: String,
        offending: Vec<String>,
    },

    /// File listings differ as multisets
    #[error(
        "File listings are not equal: only in expected {only_in_expected:?}, only in actual {only_in_actual:?}"
    )]
    FileListMismatch {
        only_in_expected: Vec<String>,
        only_in_actual: Vec<String>,
    },
}

/// A mismatching pair in a batch comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairMismatch {
    /// Position of the pair in both input lists
    pub index: usize,

    /// Release date of the expected notification
    pub release_date: String,

    /// Why the pair did not match
    pub cause: NotificationMismatch,
}

/// Reconciliation failures.
#[derive(Error, Debug)]
pub enum MismatchError {
    /// A single notification pair did not match
    #[error(transparent)]
    Notification(NotificationMismatch),

    /// Expected and actual batches have different lengths
    #[error("Expected {expected} notifications but got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// One or more pairs in a batch did not match
    #[error("{} of {total} notification pairs did not match", .mismatches.len())]
    Batch {
        total: usize,
        mismatches: Vec<PairMismatch>,
    },
}

/// Local object cache errors.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Object key cannot be mapped safely onto the cache directory
    #[error("Key cannot be cached: {0}")]
    InvalidKey(String),

    /// Downloaded copy still has the wrong size after a re-fetch
    #[error("Cached copy of {key} is {actual} bytes, expected {expected}")]
    SizeMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },
}

/// File format errors.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Mapping line without exactly two fields
    #[error("Mapping line {line} must have exactly two fields: {content:?}")]
    MappingLine { line: usize, content: String },

    /// Notification line is not a valid notification object
    #[error("Notification line {line} is invalid: {source}")]
    NotificationLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Release date could not be parsed where a date was required
    #[error("Invalid release date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[source] serde_json::Error),
}

/// How much work an error invalidates.
///
/// Used by orchestrators to decide whether to record the failure and keep
/// going or to stop the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    /// Only the release being located or counted is affected
    Release,

    /// Only the notification pair being compared is affected
    Pair,

    /// The whole batch comparison is invalid
    Batch,

    /// The run cannot continue
    Run,
}

impl std::fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Release => write!(f, "release"),
            Self::Pair => write!(f, "pair"),
            Self::Batch => write!(f, "batch"),
            Self::Run => write!(f, "run"),
        }
    }
}

/// Classifies an error by the scope of work it invalidates.
pub fn classify_error(error: &NrError) -> ErrorScope {
    match error {
        NrError::Storage(_) => ErrorScope::Release,
        NrError::Release(_) => ErrorScope::Release,
        NrError::Cache(_) => ErrorScope::Release,
        NrError::Mismatch(e) => classify_mismatch(e),
        NrError::Format(_) => ErrorScope::Run,
        NrError::Config(_) => ErrorScope::Run,
        NrError::Io(_) => ErrorScope::Run,
        NrError::Other(_) => ErrorScope::Run,
    }
}

fn classify_mismatch(error: &MismatchError) -> ErrorScope {
    match error {
        MismatchError::Notification(_) => ErrorScope::Pair,
        MismatchError::Batch { .. } => ErrorScope::Pair,
        MismatchError::LengthMismatch { .. } => ErrorScope::Batch,
    }
}

impl NrError {
    /// Scope of work this error invalidates. See [`classify_error`].
    pub fn scope(&self) -> ErrorScope {
        classify_error(self)
    }

    /// Whether a batch run may record this error and continue with the next item.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.scope(), ErrorScope::Release | ErrorScope::Pair)
    }
}

/// Result type alias using NrError.
pub type Result<T> = std::result::Result<T, NrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_marker_is_release_scoped() {
        let error = NrError::Release(ReleaseError::AmbiguousReleaseMarker {
            prefix: "rel1/".to_string(),
            found: 0,
            markers: vec![],
        });
        assert_eq!(error.scope(), ErrorScope::Release);
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_length_mismatch_is_batch_scoped() {
        let error = NrError::Mismatch(MismatchError::LengthMismatch {
            expected: 3,
            actual: 2,
        });
        assert_eq!(error.scope(), ErrorScope::Batch);
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_notification_mismatch_is_pair_scoped() {
        let error: NrError = NotificationMismatch::ReleaseDateMismatch {
            expected: "2022-04-03".to_string(),
            actual: "2022-04-13".to_string(),
        }
        .into();
        assert_eq!(error.scope(), ErrorScope::Pair);
    }

    #[test]
    fn test_format_errors_stop_the_run() {
        let error = NrError::Format(FormatError::MappingLine {
            line: 3,
            content: "2022-04-03".to_string(),
        });
        assert_eq!(error.scope(), ErrorScope::Run);
        assert!(error.to_string().contains("line 3"));
    }

    #[test]
    fn test_batch_display_counts_mismatches() {
        let error = MismatchError::Batch {
            total: 4,
            mismatches: vec![PairMismatch {
                index: 1,
                release_date: "2022-03-30".to_string(),
                cause: NotificationMismatch::FileListMismatch {
                    only_in_expected: vec!["a/gene/created/1".to_string()],
                    only_in_actual: vec![],
                },
            }],
        };
        assert_eq!(error.to_string(), "1 of 4 notification pairs did not match");
    }

    #[test]
    fn test_mismatch_serializes_with_kind_tag() {
        let mismatch = NotificationMismatch::FileListMismatch {
            only_in_expected: vec!["a/gene/created/1".to_string()],
            only_in_actual: vec!["a/gene/created/2".to_string()],
        };
        let json = serde_json::to_value(&mismatch).unwrap();
        assert_eq!(json["kind"], "file_list_mismatch");
        assert_eq!(json["only_in_actual"][0], "a/gene/created/2");
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(ErrorScope::Release.to_string(), "release");
        assert_eq!(ErrorScope::Batch.to_string(), "batch");
    }
}
