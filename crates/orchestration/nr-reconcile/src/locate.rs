//! Release discovery under a bucket prefix.

use nr_error::{ReleaseError, Result};
use nr_traits::{ObjectStore, read_all};
use nr_types::normalize_prefix;
use tracing::{debug, info};

use crate::classify::PathClassifier;

/// Release date and files found under one release prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedRelease {
    /// Normalized prefix that was listed
    pub prefix: String,

    /// Trimmed content of the marker object
    pub release_date: String,

    /// Diff files and the marker, in listing order
    pub files: Vec<String>,
}

/// List a release prefix and read its date marker.
///
/// Keys are kept in listing order if they classify as a diff file or a
/// marker; everything else goes to the exclusion sink. Exactly one marker
/// must be present among the kept keys.
///
/// # Errors
///
/// - [`ReleaseError::EmptyRelease`] if the prefix lists no objects at all
/// - [`ReleaseError::AmbiguousReleaseMarker`] for zero or several markers
/// - Storage errors from listing or reading the marker, unchanged
pub async fn locate(
    store: &dyn ObjectStore,
    classifier: &PathClassifier,
    bucket: &str,
    release_prefix: &str,
) -> Result<LocatedRelease> {
    let prefix = normalize_prefix(release_prefix);
    let entries = store.list_keys(bucket, &prefix).await?;

    debug!(
        backend = store.backend(),
        bucket,
        prefix = %prefix,
        objects = entries.len(),
        "Listed release prefix"
    );

    if entries.is_empty() {
        return Err(ReleaseError::EmptyRelease { prefix }.into());
    }

    let mut files = Vec::with_capacity(entries.len());
    let mut markers = Vec::new();
    for entry in entries {
        let class = classifier.classify(&entry.key);
        if !class.is_release_file() {
            continue;
        }
        if class.is_marker() {
            markers.push(entry.key.clone());
        }
        files.push(entry.key);
    }

    if markers.len() != 1 {
        return Err(ReleaseError::AmbiguousReleaseMarker {
            prefix,
            found: markers.len(),
            markers,
        }
        .into());
    }

    let content = read_all(store, bucket, &markers[0]).await?;
    let release_date = String::from_utf8_lossy(&content).trim().to_string();

    info!(
        bucket,
        prefix = %prefix,
        release_date = %release_date,
        files = files.len(),
        "Located release"
    );

    Ok(LocatedRelease {
        prefix,
        release_date,
        files,
    })
}
