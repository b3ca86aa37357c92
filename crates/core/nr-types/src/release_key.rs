//! Release key layout and classification.
//!
//! A release directory contains diff files laid out as
//! `<release_dir>/<table>/<operation>/<basename>` and a single marker
//! `<release_dir>/release_date.txt`. Every other key shape is excluded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Basename of the release date marker object.
pub const MARKER_FILENAME: &str = "release_date.txt";

/// Row operation recorded by a diff file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Inserted rows
    Created,
    /// Updated rows
    Updated,
    /// Deleted rows
    Deleted,
}

impl Operation {
    /// All operations in canonical order.
    pub const ALL: [Operation; 3] = [Operation::Created, Operation::Updated, Operation::Deleted];

    /// Directory name used for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown operation '{other}'")),
        }
    }
}

/// A diff file key split into its path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffFile<'a> {
    /// Release directory (first segment)
    pub dir: &'a str,
    /// Table name
    pub table: &'a str,
    /// Operation directory
    pub operation: Operation,
    /// Object basename, usually a zero-padded shard number
    pub basename: &'a str,
}

/// Classification of an object key against the release layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass<'a> {
    /// `<dir>/<table>/<operation>/<basename>`
    DiffFile(DiffFile<'a>),
    /// `<dir>/release_date.txt`
    Marker {
        /// Release directory
        dir: &'a str,
    },
    /// Any other shape
    Excluded,
}

impl<'a> KeyClass<'a> {
    /// Classify a key. Total: every string maps to exactly one class.
    ///
    /// ```
    /// use nr_types::{KeyClass, Operation};
    ///
    /// match KeyClass::of("rel1/gene/created/0000") {
    ///     KeyClass::DiffFile(diff) => assert_eq!(diff.operation, Operation::Created),
    ///     other => panic!("unexpected {other:?}"),
    /// }
    /// assert_eq!(KeyClass::of("rel1/release_date.txt"), KeyClass::Marker { dir: "rel1" });
    /// assert_eq!(KeyClass::of("rel1/gene/inserted/0000"), KeyClass::Excluded);
    /// ```
    pub fn of(key: &'a str) -> Self {
        let segments: Vec<&'a str> = key.split('/').collect();

        match segments[..] {
            [dir, table, operation, basename] => match operation.parse::<Operation>() {
                Ok(operation) => Self::DiffFile(DiffFile {
                    dir,
                    table,
                    operation,
                    basename,
                }),
                Err(_) => Self::Excluded,
            },
            [dir, name] if name == MARKER_FILENAME => Self::Marker { dir },
            _ => Self::Excluded,
        }
    }

    /// Whether the key belongs to a release (diff file or marker).
    pub fn is_release_file(&self) -> bool {
        !matches!(self, Self::Excluded)
    }

    /// Whether the key is a release date marker.
    pub fn is_marker(&self) -> bool {
        matches!(self, Self::Marker { .. })
    }

    /// The diff file parts, if this is a diff file.
    pub fn as_diff_file(&self) -> Option<&DiffFile<'a>> {
        match self {
            Self::DiffFile(diff) => Some(diff),
            _ => None,
        }
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DiffFile(_) => "diff_file",
            Self::Marker { .. } => "marker",
            Self::Excluded => "excluded",
        }
    }
}

/// Ensure a prefix ends with `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{prefix}/")
    }
}

/// First `/`-separated segment of a key.
pub fn first_segment(key: &str) -> &str {
    key.split('/').next().unwrap_or(key)
}

/// Key with its first segment (the release directory) removed.
pub fn strip_first_segment(key: &str) -> &str {
    match key.split_once('/') {
        Some((_, rest)) => rest,
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_diff_files() {
        for op in Operation::ALL {
            let key = format!("rel1/gene/{op}/000000000000");
            let class = KeyClass::of(&key);
            let diff = class.as_diff_file().unwrap();
            assert_eq!(diff.dir, "rel1");
            assert_eq!(diff.table, "gene");
            assert_eq!(diff.operation, op);
            assert_eq!(diff.basename, "000000000000");
        }
    }

    #[test]
    fn test_classify_marker() {
        assert_eq!(
            KeyClass::of("backdiff_20190701/release_date.txt"),
            KeyClass::Marker {
                dir: "backdiff_20190701"
            }
        );
    }

    #[test]
    fn test_classify_excluded_shapes() {
        let excluded = [
            "",
            "/",
            "rel1",
            "rel1/",
            "rel1/notes.txt",
            "rel1/gene/created",
            "rel1/gene/merged/0000",
            "rel1/gene/created/0000/extra",
            "rel1/sub/release_date.txt",
            "release_date.txt",
            "rel1/gene/Created/0000",
        ];
        for key in excluded {
            assert_eq!(KeyClass::of(key), KeyClass::Excluded, "key {key:?}");
        }
    }

    #[test]
    fn test_classify_empty_segments_follow_shape() {
        // Shape decides, not segment content.
        assert!(KeyClass::of("/gene/created/").as_diff_file().is_some());
        assert!(KeyClass::of("/release_date.txt").is_marker());
    }

    #[test]
    fn test_operation_round_trip_str() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
        }
        assert!("inserted".parse::<Operation>().is_err());
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("rel1"), "rel1/");
        assert_eq!(normalize_prefix("rel1/"), "rel1/");
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(first_segment("rel1/gene/created/0"), "rel1");
        assert_eq!(first_segment("rel1"), "rel1");
        assert_eq!(strip_first_segment("rel1/gene/created/0"), "gene/created/0");
        assert_eq!(strip_first_segment("rel1"), "");
    }
}
