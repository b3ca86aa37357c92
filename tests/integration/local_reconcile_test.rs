//! End-to-end reconciliation over a folder-backed store.
//!
//! These tests mirror the S3 workflow on a local directory tree, so they
//! run without LocalStack.

use crate::common::{BUCKET, mappings, write_to_dir};
use nr_error::{ErrorScope, MismatchError, NotificationMismatch, NrError};
use nr_reconcile::{
    PairStatus, ReconcileConfig, Reconciler, ReleaseWindow, derive_mappings, find_release, io,
    release_op_counts,
};
use nr_store_local::LocalStore;
use nr_types::{Notification, OpCount, Operation};
use std::sync::Arc;
use tempfile::TempDir;

fn mirror() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write_to_dir(temp_dir.path());
    temp_dir
}

fn reconciler(root: &TempDir, config: ReconcileConfig) -> Reconciler {
    Reconciler::from_config(Arc::new(LocalStore::new(root.path())), config).unwrap()
}

#[tokio::test]
async fn test_generated_notifications_validate_cleanly() {
    let data = mirror();
    let work = TempDir::new().unwrap();
    let exclusions = work.path().join("excluded.log");
    let reconciler = reconciler(
        &data,
        ReconcileConfig::new(BUCKET).with_exclusions_log(&exclusions),
    );

    let report = reconciler
        .generate_from_mappings(&mappings())
        .await
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.notifications.len(), 2);

    let second = &report.notifications[1];
    assert_eq!(second.release_date, "2022-04-13");
    assert_eq!(second.bucket, BUCKET);
    assert_eq!(second.files.len(), 5);
    assert!(!second.files.iter().any(|f| f.ends_with("README.md")));

    let log = std::fs::read_to_string(&exclusions).unwrap();
    assert_eq!(log, "excluded blob: clinvar_2022-04-13/README.md\n");

    // Round trip through the notification file format
    let path = work.path().join("received.ndjson");
    io::write_notifications(&path, &report.notifications)
        .await
        .unwrap();
    let received = io::read_notifications(&path).await.unwrap();

    let validated = reconciler.validate_received(&received).await.unwrap();
    assert!(validated.is_clean());
    assert!(validated.check().is_ok());

    let windowed = reconciler
        .reconcile_window(&mappings(), &received)
        .await
        .unwrap();
    assert_eq!(windowed.summary.matched, 2);
}

#[tokio::test]
async fn test_tampered_notification_is_reported() {
    let data = mirror();
    let reconciler = reconciler(&data, ReconcileConfig::new(BUCKET));

    let mut received = reconciler
        .generate_from_mappings(&mappings())
        .await
        .unwrap()
        .notifications;
    received[0]
        .files
        .push("clinvar_2022-04-03/gene/deleted/000000000000".to_string());
    received[1].release_date = "2022-04-14".to_string();

    let report = reconciler.validate_received(&received).await.unwrap();
    assert_eq!(report.summary.mismatched, 2);

    match &report.pairs[0].status {
        PairStatus::Mismatched {
            cause: NotificationMismatch::FileListMismatch { only_in_expected, only_in_actual },
        } => {
            assert_eq!(
                only_in_expected,
                &vec!["clinvar_2022-04-03/gene/deleted/000000000000".to_string()]
            );
            assert!(only_in_actual.is_empty());
        }
        other => panic!("unexpected status {other:?}"),
    }
    assert!(matches!(
        &report.pairs[1].status,
        PairStatus::Mismatched {
            cause: NotificationMismatch::ReleaseDateMismatch { .. }
        }
    ));

    match report.check() {
        Err(MismatchError::Batch { total, mismatches }) => {
            assert_eq!(total, 2);
            assert_eq!(mismatches.len(), 2);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_release_fails_only_that_pair() {
    let data = mirror();
    let reconciler = reconciler(&data, ReconcileConfig::new(BUCKET));

    let received = vec![
        Notification::new(
            "2022-04-03",
            BUCKET,
            vec!["clinvar_2022-04-03/release_date.txt".to_string()],
        ),
        Notification::new(
            "2022-05-01",
            BUCKET,
            vec!["clinvar_2022-05-01/release_date.txt".to_string()],
        ),
    ];

    let report = reconciler.validate_received(&received).await.unwrap();
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.mismatched, 1);
    assert_eq!(report.summary.failed, 1);
    assert!(matches!(
        report.pairs[1].status,
        PairStatus::Failed {
            scope: ErrorScope::Release,
            ..
        }
    ));
    assert_eq!(reconciler.stats().snapshot().releases_failed, 1);
}

#[tokio::test]
async fn test_length_mismatch_aborts_window() {
    let data = mirror();
    let reconciler = reconciler(&data, ReconcileConfig::new(BUCKET));

    let err = reconciler
        .reconcile_window(&mappings(), &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NrError::Mismatch(MismatchError::LengthMismatch {
            expected: 0,
            actual: 2
        })
    ));
}

#[tokio::test]
async fn test_window_selects_releases() {
    let data = mirror();
    let reconciler = reconciler(&data, ReconcileConfig::new(BUCKET));

    let window = ReleaseWindow::parse(Some("2022-04-10"), None).unwrap();
    let selected = window.filter(mappings()).unwrap();
    let report = reconciler.generate_from_mappings(&selected).await.unwrap();

    assert_eq!(report.notifications.len(), 1);
    assert_eq!(report.notifications[0].release_date, "2022-04-13");
}

#[tokio::test]
async fn test_compare_pairs_and_summary() {
    let data = mirror();
    let cache = TempDir::new().unwrap();
    let reconciler = reconciler(
        &data,
        ReconcileConfig::new(BUCKET)
            .with_cache_dir(cache.path())
            .with_count_concurrency(2),
    );

    let notifications = reconciler
        .generate_from_mappings(&mappings())
        .await
        .unwrap()
        .notifications;
    let first = find_release(&notifications, "2022-04-03", 0).unwrap().clone();
    let second = find_release(&notifications, "2022-04-13", 0).unwrap().clone();

    let reports = reconciler
        .compare_release_pairs(&[(first, second)])
        .await
        .unwrap();
    let report = &reports[0];

    assert_eq!(report.release_dates, ["2022-04-03", "2022-04-13"]);
    assert!(!report.op_counts_match());
    assert_eq!(
        report.op_count_diffs,
        [
            vec![OpCount::new("submitter", Operation::Updated, 1)],
            vec![
                OpCount::new("submitter", Operation::Deleted, 1),
                OpCount::new("submitter", Operation::Updated, 3),
            ],
        ]
    );
    assert_eq!(
        report.tables_in_diff().into_iter().collect::<Vec<_>>(),
        vec!["submitter"]
    );

    // Files shared by both releases with equal counts drop out of the diff
    assert!(
        !report.file_count_diffs[1]
            .iter()
            .any(|(key, _)| key == "gene/created/000000000000")
    );

    let summary = release_op_counts(&reports);
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].release_date, "2022-04-13");
    assert_eq!(summary[0].op_counts.len(), 3);

    // Every counted object landed in the local cache
    assert!(
        cache
            .path()
            .join("clinvar_2022-04-13/submitter/updated/000000000001")
            .is_file()
    );
}

#[tokio::test]
async fn test_derived_mappings_match_source() {
    let data = mirror();
    let work = TempDir::new().unwrap();
    let reconciler = reconciler(&data, ReconcileConfig::new(BUCKET));

    let notifications = reconciler
        .generate_from_mappings(&mappings())
        .await
        .unwrap()
        .notifications;
    let derived = derive_mappings(&notifications).unwrap();
    assert_eq!(derived, mappings());

    let path = work.path().join("release_mappings.txt");
    io::write_mappings(&path, &derived).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "2022-04-03    clinvar_2022-04-03\n2022-04-13    clinvar_2022-04-13\n"
    );
}
