//! Release notification record.

use serde::{Deserialize, Serialize};

use crate::release_key::{KeyClass, first_segment, normalize_prefix};

/// Canonical summary record of one release's bucket contents.
///
/// Field order is the serialized key order (`release_date`, `bucket`, `files`)
/// so notification files stay diffable line by line.
///
/// ```
/// use nr_types::Notification;
///
/// let n = Notification::new(
///     "2022-04-03",
///     "ingest-results",
///     vec!["rel1/gene/created/0000".to_string(), "rel1/release_date.txt".to_string()],
/// );
/// assert_eq!(n.release_dir(), Some("rel1"));
/// assert_eq!(n.marker_keys(), vec!["rel1/release_date.txt"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Release date as stored in the marker object
    pub release_date: String,

    /// Bucket holding the release
    pub bucket: String,

    /// Release keys in listing order
    pub files: Vec<String>,
}

impl Notification {
    /// Create a new notification.
    pub fn new(
        release_date: impl Into<String>,
        bucket: impl Into<String>,
        files: Vec<String>,
    ) -> Self {
        Self {
            release_date: release_date.into(),
            bucket: bucket.into(),
            files,
        }
    }

    /// Release directory, taken from the first file.
    pub fn release_dir(&self) -> Option<&str> {
        self.files.first().map(|f| first_segment(f))
    }

    /// Release directory with a trailing `/`.
    pub fn release_prefix(&self) -> Option<String> {
        self.release_dir().map(normalize_prefix)
    }

    /// Files that do not start with the release prefix of the first file.
    ///
    /// Returns the prefix that was checked alongside the offenders. An empty
    /// file list yields an empty prefix and no offenders.
    pub fn files_outside_prefix(&self) -> (String, Vec<String>) {
        let prefix = self.release_prefix().unwrap_or_default();
        let offending = self
            .files
            .iter()
            .filter(|f| !f.starts_with(&prefix))
            .cloned()
            .collect();
        (prefix, offending)
    }

    /// Keys classified as release date markers.
    pub fn marker_keys(&self) -> Vec<&str> {
        self.files
            .iter()
            .map(String::as_str)
            .filter(|f| KeyClass::of(f).is_marker())
            .collect()
    }

    /// File list sorted lexicographically.
    pub fn sorted_files(&self) -> Vec<String> {
        let mut files = self.files.clone();
        files.sort();
        files
    }
}

/// Find the `occurrence`-th notification (0-based) with a given release date.
pub fn find_by_release_date<'a>(
    notifications: &'a [Notification],
    release_date: &str,
    occurrence: usize,
) -> Option<&'a Notification> {
    notifications
        .iter()
        .filter(|n| n.release_date == release_date)
        .nth(occurrence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(files: &[&str]) -> Notification {
        Notification::new(
            "2019-07-01",
            "bucket",
            files.iter().map(|f| f.to_string()).collect(),
        )
    }

    #[test]
    fn test_serialized_key_order() {
        let n = notification(&["backdiff_20190701/release_date.txt"]);
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(
            json,
            r#"{"release_date":"2019-07-01","bucket":"bucket","files":["backdiff_20190701/release_date.txt"]}"#
        );
    }

    #[test]
    fn test_files_outside_prefix() {
        let n = notification(&["a/gene/created/0", "b/gene/created/1", "a/release_date.txt"]);
        let (prefix, offending) = n.files_outside_prefix();
        assert_eq!(prefix, "a/");
        assert_eq!(offending, vec!["b/gene/created/1".to_string()]);
    }

    #[test]
    fn test_prefix_requires_full_segment() {
        // "ab/..." does not live under "a/"
        let n = notification(&["a/gene/created/0", "ab/gene/created/1"]);
        let (_, offending) = n.files_outside_prefix();
        assert_eq!(offending.len(), 1);
    }

    #[test]
    fn test_empty_files() {
        let n = notification(&[]);
        assert!(n.release_dir().is_none());
        let (prefix, offending) = n.files_outside_prefix();
        assert!(prefix.is_empty());
        assert!(offending.is_empty());
    }

    #[test]
    fn test_find_by_release_date() {
        let notifications = vec![
            Notification::new("2022-03-20", "b", vec!["r1/release_date.txt".to_string()]),
            Notification::new("2022-03-30", "b", vec!["r2/release_date.txt".to_string()]),
            Notification::new("2022-03-20", "b", vec!["r3/release_date.txt".to_string()]),
        ];
        let second = find_by_release_date(&notifications, "2022-03-20", 1).unwrap();
        assert_eq!(second.release_dir(), Some("r3"));
        assert!(find_by_release_date(&notifications, "2022-04-01", 0).is_none());
    }
}
