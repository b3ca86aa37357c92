//! Multiset difference of two sequences.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;

/// Symmetric multiset difference.
///
/// Each side keeps the input order of the sequence it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult<T> {
    /// Elements of A with no matching occurrence in B
    pub only_in_a: Vec<T>,

    /// Elements of B with no matching occurrence in A
    pub only_in_b: Vec<T>,
}

impl<T> DiffResult<T> {
    /// Whether the two inputs were equal as multisets.
    pub fn is_empty(&self) -> bool {
        self.only_in_a.is_empty() && self.only_in_b.is_empty()
    }

    /// Exchange the two sides.
    pub fn swap(self) -> Self {
        Self {
            only_in_a: self.only_in_b,
            only_in_b: self.only_in_a,
        }
    }

    /// Both sides as a two-element array, A first.
    pub fn into_pair(self) -> [Vec<T>; 2] {
        [self.only_in_a, self.only_in_b]
    }
}

/// Compute `(A - B, B - A)` as multisets.
///
/// Every occurrence in B cancels at most one occurrence in A (the earliest
/// one not yet cancelled) and vice versa, so surplus duplicates survive.
///
/// ```
/// use nr_reconcile::multiset_diff;
///
/// let diff = multiset_diff(&["a", "b", "b", "c"], &["b", "c", "d"]);
/// assert_eq!(diff.only_in_a, vec!["a", "b"]);
/// assert_eq!(diff.only_in_b, vec!["d"]);
/// ```
pub fn multiset_diff<T: Eq + Hash + Clone>(a: &[T], b: &[T]) -> DiffResult<T> {
    DiffResult {
        only_in_a: subtract(a, b),
        only_in_b: subtract(b, a),
    }
}

fn subtract<T: Eq + Hash + Clone>(from: &[T], remove: &[T]) -> Vec<T> {
    let mut pending: HashMap<&T, usize> = HashMap::with_capacity(remove.len());
    for item in remove {
        *pending.entry(item).or_insert(0) += 1;
    }

    from.iter()
        .filter(|item| match pending.get_mut(item) {
            Some(n) if *n > 0 => {
                *n -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identity() {
        let a = strs(&["x", "y", "x"]);
        assert!(multiset_diff(&a, &a).is_empty());
    }

    #[test]
    fn test_against_empty() {
        let a = strs(&["x", "y", "x"]);
        let diff = multiset_diff(&a, &[]);
        assert_eq!(diff.only_in_a, a);
        assert!(diff.only_in_b.is_empty());
    }

    #[test]
    fn test_symmetry() {
        let cases = [
            (strs(&["a", "b", "b"]), strs(&["b", "c"])),
            (strs(&[]), strs(&["q"])),
            (strs(&["z", "z", "z"]), strs(&["z"])),
            (strs(&["m", "n"]), strs(&["n", "m"])),
        ];
        for (a, b) in cases {
            assert_eq!(multiset_diff(&a, &b), multiset_diff(&b, &a).swap());
        }
    }

    #[test]
    fn test_duplicates_survive() {
        let diff = multiset_diff(&[1, 1, 1, 2], &[1, 2, 2]);
        assert_eq!(diff.only_in_a, vec![1, 1]);
        assert_eq!(diff.only_in_b, vec![2]);
    }

    #[test]
    fn test_keeps_input_order() {
        let diff = multiset_diff(&strs(&["d", "a", "c", "a"]), &strs(&["a"]));
        assert_eq!(diff.only_in_a, strs(&["d", "c", "a"]));
    }

    #[test]
    fn test_file_list_scenario() {
        let diff = multiset_diff(
            &strs(&["a/gene/created/0", "a/gene/created/1"]),
            &strs(&["a/gene/created/0", "a/gene/created/2"]),
        );
        assert_eq!(
            diff.into_pair(),
            [strs(&["a/gene/created/1"]), strs(&["a/gene/created/2"])]
        );
    }
}
