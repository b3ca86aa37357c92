//! nr-reconcile - Release notification reconciliation engine.
//!
//! This crate regenerates release notifications from object store state,
//! compares them with notifications received from an external system, and
//! diffs record counts between releases. It provides:
//!
//! - Key classification with an audit log of excluded keys
//! - Release location (exactly one `release_date.txt` marker per release)
//! - Structural notification comparison with multiset file-list diffs
//! - Non-empty line counting with an injected memo and optional local cache
//! - Aggregation of counts by table and operation, and pairwise diffs
//! - Mapping and notification file formats
//!
//! # Example
//!
//! ```ignore
//! use nr_reconcile::{ReconcileConfig, Reconciler, io};
//! use nr_store_s3::{S3Config, S3Store};
//! use std::sync::Arc;
//!
//! let store = Arc::new(S3Store::from_config(&S3Config::new()).await?);
//! let config = ReconcileConfig::new("ingest-results").with_cache_dir(".cache");
//! let reconciler = Reconciler::from_config(store, config)?;
//!
//! let mappings = io::read_mappings("release_mappings.txt").await?;
//! let received = io::read_notifications("received.ndjson").await?;
//! let report = reconciler.reconcile_window(&mappings, &received).await?;
//! eprintln!("{} of {} pairs matched", report.summary.matched, report.summary.total);
//! ```

pub mod builder;
pub mod cache;
pub mod classify;
pub mod compare;
pub mod config;
pub mod counts;
pub mod diff;
pub mod exclusions;
pub mod io;
pub mod locate;
pub mod memo;
pub mod reconciler;
pub mod report;
pub mod stats;

pub use builder::build_notification;
pub use cache::{CachedObject, LocalObjectCache};
pub use classify::PathClassifier;
pub use compare::{check_prefix, compare, compare_many, compare_pairs};
pub use config::{ReconcileConfig, ReleaseWindow, parse_release_date};
pub use counts::{
    DEFAULT_COUNT_CONCURRENCY, LineCounter, RecordCounter, aggregate_by_table_op, count_stream,
    relative_count_diff,
};
pub use diff::{DiffResult, multiset_diff};
pub use exclusions::{ExclusionSink, FileExclusionLog, MemoryExclusionLog, NoopExclusionLog};
pub use locate::{LocatedRelease, locate};
pub use memo::CountMemo;
pub use reconciler::{Reconciler, derive_mappings, find_release};
pub use report::{
    GenerationReport, PairOutcome, PairReport, PairStatus, ReconciliationReport,
    ReconciliationSummary, ReleaseFailure, ReleaseOpCounts, release_op_counts,
};
pub use stats::{ReconcileStats, StatsSnapshot};
