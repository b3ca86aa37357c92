//! Per-file counts and per-table operation rollups.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use crate::release_key::Operation;

/// Ordered mapping from object key to a count.
///
/// Used for record counts (non-empty lines per file) and for byte sizes.
/// Iteration and serialization follow insertion order; re-inserting a key
/// replaces its value in place.
#[derive(Debug, Clone, Default)]
pub struct KeyCounts {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

/// Non-empty line counts per release key.
pub type RecordCounts = KeyCounts;

/// Object sizes in bytes per release key.
pub type FileSizes = KeyCounts;

impl KeyCounts {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a count. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, count: u64) -> Option<u64> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, count)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, count));
                None
            }
        }
    }

    /// Count for a key.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.index.get(key).map(|&pos| self.entries[pos].1)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }
}

impl PartialEq for KeyCounts {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for KeyCounts {}

impl<K: Into<String>> FromIterator<(K, u64)> for KeyCounts {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (key, count) in iter {
            counts.insert(key, count);
        }
        counts
    }
}

impl IntoIterator for KeyCounts {
    type Item = (String, u64);
    type IntoIter = std::vec::IntoIter<(String, u64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for KeyCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for KeyCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyCountsVisitor;

        impl<'de> Visitor<'de> for KeyCountsVisitor {
            type Value = KeyCounts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of object key to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<KeyCounts, A::Error> {
                let mut counts = KeyCounts::new();
                while let Some((key, count)) = access.next_entry::<String, u64>()? {
                    counts.insert(key, count);
                }
                Ok(counts)
            }
        }

        deserializer.deserialize_map(KeyCountsVisitor)
    }
}

/// Summed record count for one table and operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpCount {
    /// Table name
    pub table: String,

    /// Operation
    pub operation: Operation,

    /// Summed non-empty line count
    pub count: u64,
}

impl OpCount {
    /// Create a new entry.
    pub fn new(table: impl Into<String>, operation: Operation, count: u64) -> Self {
        Self {
            table: table.into(),
            operation,
            count,
        }
    }
}

impl fmt::Display for OpCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.table, self.operation, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order_and_replaces() {
        let mut counts = KeyCounts::new();
        assert_eq!(counts.insert("r/gene/updated/0", 5), None);
        assert_eq!(counts.insert("r/gene/created/0", 3), None);
        assert_eq!(counts.insert("r/gene/updated/0", 7), Some(5));

        let keys: Vec<_> = counts.keys().collect();
        assert_eq!(keys, vec!["r/gene/updated/0", "r/gene/created/0"]);
        assert_eq!(counts.get("r/gene/updated/0"), Some(7));
        assert_eq!(counts.total(), 10);
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let counts: KeyCounts = [("z/release_date.txt", 0), ("a/gene/created/0", 3)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"z/release_date.txt":0,"a/gene/created/0":3}"#);

        let back: KeyCounts = serde_json::from_str(&json).unwrap();
        assert_eq!(back, counts);
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let a: KeyCounts = [("x", 1), ("y", 2)].into_iter().collect();
        let b: KeyCounts = [("y", 2), ("x", 1)].into_iter().collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_op_count_serialization() {
        let entry = OpCount::new("submitter", Operation::Deleted, 4);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["operation"], "deleted");
        assert_eq!(entry.to_string(), "submitter/deleted: 4");
    }
}
