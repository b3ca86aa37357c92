//! Serializable reconciliation and comparison reports.

use nr_error::{ErrorScope, MismatchError, NotificationMismatch, NrError, PairMismatch};
use nr_types::{Notification, OpCount, RecordCounts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A release that could not be generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseFailure {
    /// Position in the input list
    pub index: usize,

    /// Release date from the mapping or received notification
    pub release_date: String,

    /// Release directory that was listed, when known
    pub release_dir: Option<String>,

    /// How much work the error invalidated
    pub scope: ErrorScope,

    /// Error message
    pub error: String,
}

impl ReleaseFailure {
    pub(crate) fn new(
        index: usize,
        release_date: &str,
        release_dir: Option<&str>,
        error: &NrError,
    ) -> Self {
        Self {
            index,
            release_date: release_date.to_string(),
            release_dir: release_dir.map(str::to_string),
            scope: error.scope(),
            error: error.to_string(),
        }
    }
}

/// Notifications generated from a list of mappings or received notifications.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    /// Successfully generated notifications, in input order
    pub notifications: Vec<Notification>,

    /// Releases that failed, in input order
    pub failures: Vec<ReleaseFailure>,
}

impl GenerationReport {
    /// Whether every release was generated.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of reconciling one notification pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairStatus {
    /// Received and generated notifications are equal
    Matched,

    /// They differ
    Mismatched { cause: NotificationMismatch },

    /// The release could not be generated
    Failed { scope: ErrorScope, error: String },
}

/// One reconciled pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairOutcome {
    /// Position in both lists
    pub index: usize,

    /// Release date of the received notification
    pub release_date: String,

    /// Notification received from the external system
    pub received: Notification,

    /// Notification regenerated from bucket state
    pub generated: Option<Notification>,

    #[serde(flatten)]
    pub status: PairStatus,
}

/// Pair counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub total: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub failed: usize,
}

/// Every pair's outcome plus a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub summary: ReconciliationSummary,
    pub pairs: Vec<PairOutcome>,
}

impl ReconciliationReport {
    pub(crate) fn from_pairs(pairs: Vec<PairOutcome>) -> Self {
        let mut summary = ReconciliationSummary {
            total: pairs.len(),
            ..Default::default()
        };
        for pair in &pairs {
            match pair.status {
                PairStatus::Matched => summary.matched += 1,
                PairStatus::Mismatched { .. } => summary.mismatched += 1,
                PairStatus::Failed { .. } => summary.failed += 1,
            }
        }
        Self { summary, pairs }
    }

    /// Whether every pair matched.
    pub fn is_clean(&self) -> bool {
        self.summary.matched == self.summary.total
    }

    /// Mismatching pairs with their causes.
    pub fn mismatches(&self) -> Vec<PairMismatch> {
        self.pairs
            .iter()
            .filter_map(|pair| match &pair.status {
                PairStatus::Mismatched { cause } => Some(PairMismatch {
                    index: pair.index,
                    release_date: pair.release_date.clone(),
                    cause: cause.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Generated notifications for pairs that could be generated.
    pub fn generated(&self) -> Vec<Notification> {
        self.pairs
            .iter()
            .filter_map(|pair| pair.generated.clone())
            .collect()
    }

    /// Fail with every mismatching pair, if any.
    pub fn check(&self) -> Result<(), MismatchError> {
        let mismatches = self.mismatches();
        if mismatches.is_empty() {
            return Ok(());
        }
        Err(MismatchError::Batch {
            total: self.summary.total,
            mismatches,
        })
    }
}

/// Record counts of two releases side by side.
///
/// Every two-element array holds the first release then the second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReport {
    pub notifications: [Notification; 2],
    pub release_dates: [String; 2],
    pub record_counts: [RecordCounts; 2],
    pub op_counts: [Vec<OpCount>; 2],

    /// Operation counts present in only one release
    pub op_count_diffs: [Vec<OpCount>; 2],

    /// Per-file counts, keyed without the release directory, present in
    /// only one release
    pub file_count_diffs: [Vec<(String, u64)>; 2],
}

impl PairReport {
    /// Whether both releases have identical operation counts.
    pub fn op_counts_match(&self) -> bool {
        self.op_count_diffs.iter().all(Vec::is_empty)
    }

    /// Tables appearing on either side of the operation count diff.
    pub fn tables_in_diff(&self) -> BTreeSet<&str> {
        self.op_count_diffs
            .iter()
            .flatten()
            .map(|entry| entry.table.as_str())
            .collect()
    }
}

/// Operation counts of one release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOpCounts {
    pub release_date: String,
    pub op_counts: Vec<OpCount>,
}

/// Operation counts of the second release of each pair.
pub fn release_op_counts(reports: &[PairReport]) -> Vec<ReleaseOpCounts> {
    reports
        .iter()
        .map(|report| ReleaseOpCounts {
            release_date: report.release_dates[1].clone(),
            op_counts: report.op_counts[1].clone(),
        })
        .collect()
}
