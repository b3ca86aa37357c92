//! Reconciliation of received notifications against bucket state, and
//! record count comparison across releases.

use nr_error::{NotificationMismatch, NrError, ReleaseError, Result};
use nr_traits::ObjectStore;
use nr_types::{Notification, ReleaseMapping, find_by_release_date};
use std::sync::Arc;
use tracing::{info, warn};

use crate::builder::build_notification;
use crate::cache::LocalObjectCache;
use crate::classify::PathClassifier;
use crate::compare::{check_prefix, compare};
use crate::config::ReconcileConfig;
use crate::counts::{RecordCounter, aggregate_by_table_op, relative_count_diff};
use crate::diff::multiset_diff;
use crate::exclusions::{ExclusionSink, FileExclusionLog};
use crate::memo::CountMemo;
use crate::report::{
    GenerationReport, PairOutcome, PairReport, PairStatus, ReconciliationReport, ReleaseFailure,
};
use crate::stats::ReconcileStats;

/// Orchestrates release generation, reconciliation and count comparison.
///
/// Per-release and per-pair failures are collected into reports; only
/// errors that invalidate the whole run are returned as `Err`.
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    classifier: PathClassifier,
    counter: RecordCounter,
    config: ReconcileConfig,
    stats: Arc<ReconcileStats>,
}

impl Reconciler {
    /// Create a reconciler with no exclusions log and no local cache.
    pub fn new(store: Arc<dyn ObjectStore>, config: ReconcileConfig) -> Self {
        let stats = Arc::new(ReconcileStats::new());
        let classifier = PathClassifier::default().with_stats(stats.clone());
        let counter = RecordCounter::new(store.clone())
            .with_stats(stats.clone())
            .with_concurrency(config.count_concurrency);

        Self {
            store,
            classifier,
            counter,
            config,
            stats,
        }
    }

    /// Create a reconciler with the exclusions log and cache named by `config`.
    pub fn from_config(store: Arc<dyn ObjectStore>, config: ReconcileConfig) -> Result<Self> {
        config.validate()?;

        let exclusions_log = config.exclusions_log.clone();
        let cache_dir = config.cache_dir.clone();
        let mut reconciler = Self::new(store, config);

        if let Some(path) = exclusions_log {
            reconciler = reconciler.with_exclusion_sink(Arc::new(FileExclusionLog::open(path)?));
        }
        if let Some(dir) = cache_dir {
            reconciler.counter = reconciler
                .counter
                .with_cache(Arc::new(LocalObjectCache::new(dir)));
        }
        Ok(reconciler)
    }

    /// Send excluded keys to `sink`.
    pub fn with_exclusion_sink(mut self, sink: Arc<dyn ExclusionSink>) -> Self {
        self.classifier = PathClassifier::new(sink).with_stats(self.stats.clone());
        self
    }

    /// Share a count memo with other reconcilers or runs.
    pub fn with_memo(mut self, memo: Arc<CountMemo>) -> Self {
        self.counter = self.counter.with_memo(memo);
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    pub fn counter(&self) -> &RecordCounter {
        &self.counter
    }

    /// Build the notification for a release prefix.
    pub async fn build(&self, bucket: &str, release_prefix: &str) -> Result<Notification> {
        let notification =
            build_notification(self.store.as_ref(), &self.classifier, bucket, release_prefix)
                .await?;
        self.stats.record_listed(notification.files.len() as u64);
        self.stats.record_release_built();
        Ok(notification)
    }

    /// Build the notification for a mapping in the configured bucket.
    ///
    /// With date verification on, a marker date different from the mapping's
    /// date fails with [`ReleaseError::MappingDateMismatch`].
    pub async fn generate(&self, mapping: &ReleaseMapping) -> Result<Notification> {
        if self.config.bucket.is_empty() {
            return Err(NrError::Config(
                "a bucket is required to generate notifications from mappings".to_string(),
            ));
        }

        let prefix = mapping.prefix();
        let notification = self.build(&self.config.bucket, &prefix).await?;

        if self.config.verify_mapping_dates && notification.release_date != mapping.release_date {
            return Err(ReleaseError::MappingDateMismatch {
                prefix,
                mapped: mapping.release_date.clone(),
                generated: notification.release_date,
            }
            .into());
        }
        Ok(notification)
    }

    /// Generate a notification for each mapping, in mapping order.
    pub async fn generate_from_mappings(
        &self,
        mappings: &[ReleaseMapping],
    ) -> Result<GenerationReport> {
        let mut report = GenerationReport::default();
        for (index, mapping) in mappings.iter().enumerate() {
            match self.generate(mapping).await {
                Ok(notification) => report.notifications.push(notification),
                Err(e) => report.failures.push(self.absorb(
                    index,
                    &mapping.release_date,
                    Some(mapping.release_dir.as_str()),
                    e,
                )?),
            }
        }

        info!(
            generated = report.notifications.len(),
            failed = report.failures.len(),
            "Generated notifications from mappings"
        );
        Ok(report)
    }

    /// Rebuild one received notification from its own bucket and directory.
    pub async fn regenerate_one(&self, received: &Notification) -> Result<Notification> {
        let prefix = check_prefix(received)?;
        self.build(&received.bucket, &prefix).await
    }

    /// Rebuild every received notification, in input order.
    pub async fn regenerate(&self, received: &[Notification]) -> Result<GenerationReport> {
        let mut report = GenerationReport::default();
        for (index, notification) in received.iter().enumerate() {
            match self.regenerate_one(notification).await {
                Ok(generated) => report.notifications.push(generated),
                Err(e) => report.failures.push(self.absorb(
                    index,
                    &notification.release_date,
                    notification.release_dir(),
                    e,
                )?),
            }
        }
        Ok(report)
    }

    /// Reconcile received notifications against notifications generated
    /// from `mappings`, pairing them by position.
    ///
    /// # Errors
    ///
    /// [`nr_error::MismatchError::LengthMismatch`] if the lists differ in
    /// length, or any error that invalidates the whole run.
    pub async fn reconcile_window(
        &self,
        mappings: &[ReleaseMapping],
        received: &[Notification],
    ) -> Result<ReconciliationReport> {
        ensure_same_length(received.len(), mappings.len())?;

        let mut pairs = Vec::with_capacity(received.len());
        for (index, (mapping, expected)) in mappings.iter().zip(received).enumerate() {
            let generated = self.generate(mapping).await;
            pairs.push(self.pair_outcome(index, expected, Some(mapping.release_dir.as_str()), generated)?);
        }

        Ok(self.finish_report(pairs))
    }

    /// Reconcile received notifications against bucket state, using each
    /// notification's own bucket and release directory.
    pub async fn validate_received(&self, received: &[Notification]) -> Result<ReconciliationReport> {
        let mut pairs = Vec::with_capacity(received.len());
        for (index, expected) in received.iter().enumerate() {
            let generated = self.regenerate_one(expected).await;
            pairs.push(self.pair_outcome(index, expected, expected.release_dir(), generated)?);
        }

        Ok(self.finish_report(pairs))
    }

    /// Count, aggregate and diff the records of two releases.
    pub async fn compare_release_pair(
        &self,
        first: &Notification,
        second: &Notification,
    ) -> Result<PairReport> {
        let first_counts = self.counter.count_lines(&first.bucket, &first.files).await?;
        let second_counts = self.counter.count_lines(&second.bucket, &second.files).await?;

        let first_ops = aggregate_by_table_op(&first_counts);
        let second_ops = aggregate_by_table_op(&second_counts);
        let op_count_diffs = multiset_diff(&first_ops, &second_ops).into_pair();
        let file_count_diffs = relative_count_diff(&first_counts, &second_counts).into_pair();

        info!(
            first = %first.release_date,
            second = %second.release_date,
            op_diffs = op_count_diffs[0].len() + op_count_diffs[1].len(),
            "Compared release record counts"
        );

        Ok(PairReport {
            notifications: [first.clone(), second.clone()],
            release_dates: [first.release_date.clone(), second.release_date.clone()],
            record_counts: [first_counts, second_counts],
            op_counts: [first_ops, second_ops],
            op_count_diffs,
            file_count_diffs,
        })
    }

    /// Compare each pair of releases in order.
    pub async fn compare_release_pairs(
        &self,
        pairs: &[(Notification, Notification)],
    ) -> Result<Vec<PairReport>> {
        let mut reports = Vec::with_capacity(pairs.len());
        for (first, second) in pairs {
            reports.push(self.compare_release_pair(first, second).await?);
        }
        Ok(reports)
    }

    fn pair_outcome(
        &self,
        index: usize,
        expected: &Notification,
        release_dir: Option<&str>,
        generated: Result<Notification>,
    ) -> Result<PairOutcome> {
        let (generated, status) = match generated {
            Ok(generated) => {
                let status = match compare(expected, &generated) {
                    Ok(()) => PairStatus::Matched,
                    Err(cause) => {
                        warn!(index, release_date = %expected.release_date, cause = %cause, "Notification mismatch");
                        PairStatus::Mismatched { cause }
                    }
                };
                (Some(generated), status)
            }
            Err(NrError::Mismatch(nr_error::MismatchError::Notification(cause))) => {
                warn!(index, release_date = %expected.release_date, cause = %cause, "Received notification is malformed");
                (None, PairStatus::Mismatched { cause })
            }
            Err(e) => {
                let failure = self.absorb(index, &expected.release_date, release_dir, e)?;
                (
                    None,
                    PairStatus::Failed {
                        scope: failure.scope,
                        error: failure.error,
                    },
                )
            }
        };

        match &status {
            PairStatus::Matched => self.stats.record_pair(true),
            PairStatus::Mismatched { .. } => self.stats.record_pair(false),
            PairStatus::Failed { .. } => {}
        }

        Ok(PairOutcome {
            index,
            release_date: expected.release_date.clone(),
            received: expected.clone(),
            generated,
            status,
        })
    }

    fn finish_report(&self, pairs: Vec<PairOutcome>) -> ReconciliationReport {
        let report = ReconciliationReport::from_pairs(pairs);
        info!(
            total = report.summary.total,
            matched = report.summary.matched,
            mismatched = report.summary.mismatched,
            failed = report.summary.failed,
            "Reconciliation complete"
        );
        report
    }

    /// Turn a recoverable error into a recorded failure, or propagate it.
    fn absorb(
        &self,
        index: usize,
        release_date: &str,
        release_dir: Option<&str>,
        error: NrError,
    ) -> Result<ReleaseFailure> {
        if !error.is_recoverable() {
            return Err(error);
        }
        warn!(index, release_date, release_dir, error = %error, scope = %error.scope(), "Release failed");
        self.stats.record_release_failed();
        Ok(ReleaseFailure::new(index, release_date, release_dir, &error))
    }
}

fn ensure_same_length(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(nr_error::MismatchError::LengthMismatch { expected, actual }.into());
    }
    Ok(())
}

/// Seed mappings from a trusted notification set.
///
/// Each mapping pairs a notification's release date with the first path
/// segment of its first file.
pub fn derive_mappings(notifications: &[Notification]) -> Result<Vec<ReleaseMapping>> {
    notifications
        .iter()
        .map(|notification| {
            ReleaseMapping::from_notification(notification).ok_or_else(|| {
                NrError::from(NotificationMismatch::PrefixInconsistency {
                    prefix: String::new(),
                    offending: Vec::new(),
                })
            })
        })
        .collect()
}

/// Find the `occurrence`-th notification (0-based) with a release date.
pub fn find_release<'a>(
    notifications: &'a [Notification],
    release_date: &str,
    occurrence: usize,
) -> Result<&'a Notification> {
    find_by_release_date(notifications, release_date, occurrence).ok_or_else(|| {
        ReleaseError::UnknownReleaseDate {
            release_date: release_date.to_string(),
            occurrence,
        }
        .into()
    })
}
