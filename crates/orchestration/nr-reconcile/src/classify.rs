//! Key classification with exclusion auditing.

use nr_types::KeyClass;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::exclusions::{ExclusionSink, NoopExclusionLog};
use crate::stats::ReconcileStats;

/// Classifies object keys against the release layout.
///
/// Never fails: unrecognized shapes are [`KeyClass::Excluded`] and are
/// written to the exclusion sink.
#[derive(Clone)]
pub struct PathClassifier {
    sink: Arc<dyn ExclusionSink>,
    stats: Option<Arc<ReconcileStats>>,
}

impl Default for PathClassifier {
    fn default() -> Self {
        Self::new(Arc::new(NoopExclusionLog))
    }
}

impl std::fmt::Debug for PathClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathClassifier").finish_non_exhaustive()
    }
}

impl PathClassifier {
    /// Create a classifier writing exclusions to `sink`.
    pub fn new(sink: Arc<dyn ExclusionSink>) -> Self {
        Self { sink, stats: None }
    }

    /// Count exclusions in `stats`.
    pub fn with_stats(mut self, stats: Arc<ReconcileStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Classify one key, auditing it if excluded.
    pub fn classify<'a>(&self, key: &'a str) -> KeyClass<'a> {
        let class = KeyClass::of(key);
        if class == KeyClass::Excluded {
            warn!(key, "Excluding key outside the release layout");
            self.sink.record(key);
            if let Some(stats) = &self.stats {
                stats.record_excluded();
            }
        } else {
            trace!(key, class = class.label(), "Classified key");
        }
        class
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusions::MemoryExclusionLog;

    #[test]
    fn test_classify_records_only_exclusions() {
        let log = Arc::new(MemoryExclusionLog::new());
        let stats = Arc::new(ReconcileStats::new());
        let classifier = PathClassifier::new(log.clone()).with_stats(stats.clone());

        let keys = [
            "rel1/gene/created/0000",
            "rel1/release_date.txt",
            "rel1/gene/created",
            "rel1/gene/renamed/0000",
            "",
            "rel1/sub/release_date.txt",
        ];
        let classes: Vec<_> = keys.iter().map(|k| classifier.classify(k)).collect();

        assert!(classes[0].as_diff_file().is_some());
        assert!(classes[1].is_marker());
        assert!(classes[2..].iter().all(|c| *c == KeyClass::Excluded));
        assert_eq!(
            log.keys(),
            vec![
                "rel1/gene/created",
                "rel1/gene/renamed/0000",
                "",
                "rel1/sub/release_date.txt"
            ]
        );
        assert_eq!(stats.snapshot().keys_excluded, 4);
    }
}
