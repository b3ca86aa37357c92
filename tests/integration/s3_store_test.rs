//! S3 store integration tests using LocalStack.
//!
//! These tests verify listing, reads and sizes against a real S3 API, and
//! run a full reconciliation over releases uploaded to LocalStack.

use crate::common::{BUCKET, LocalStackTestContext, mappings, releases};
use nr_error::{NrError, StorageError};
use nr_reconcile::{ReconcileConfig, Reconciler};
use nr_traits::{ObjectStore, read_all};
use std::sync::Arc;

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_list_keys_is_prefix_scoped_and_ordered() {
    let ctx = LocalStackTestContext::new().await;

    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    let bucket = "nr-test-list";
    ctx.create_bucket(bucket).await.unwrap();
    for i in (0..25).rev() {
        ctx.put_object(bucket, &format!("rel1/gene/created/{i:04}"), "x\n")
            .await
            .unwrap();
    }
    ctx.put_object(bucket, "rel10/release_date.txt", "2022-01-01\n")
        .await
        .unwrap();

    let store = ctx.store().await;
    let entries = store.list_keys(bucket, "rel1/").await.unwrap();

    assert_eq!(entries.len(), 25);
    assert_eq!(entries[0].key, "rel1/gene/created/0000");
    assert!(entries.windows(2).all(|w| w[0].key < w[1].key));
    assert!(entries.iter().all(|e| e.size == 2));
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_read_and_size() {
    let ctx = LocalStackTestContext::new().await;

    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    let bucket = "nr-test-read";
    ctx.create_bucket(bucket).await.unwrap();
    ctx.put_object(bucket, "rel1/release_date.txt", "2022-04-03\n")
        .await
        .unwrap();

    let store = ctx.store().await;
    let body = read_all(&store, bucket, "rel1/release_date.txt")
        .await
        .unwrap();
    assert_eq!(&body[..], b"2022-04-03\n");
    assert_eq!(
        store
            .object_size(bucket, "rel1/release_date.txt")
            .await
            .unwrap(),
        11
    );

    let err = store
        .object_size(bucket, "rel1/missing")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        NrError::Storage(StorageError::NotFound { .. })
    ));
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_reconcile_uploaded_releases() {
    let ctx = LocalStackTestContext::new().await;

    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    ctx.create_bucket(BUCKET).await.unwrap();
    ctx.upload_releases(BUCKET, &releases()).await.unwrap();

    let store = Arc::new(ctx.store().await);
    let reconciler = Reconciler::from_config(store, ReconcileConfig::new(BUCKET)).unwrap();

    let generated = reconciler
        .generate_from_mappings(&mappings())
        .await
        .unwrap();
    assert!(generated.is_complete());

    let report = reconciler
        .reconcile_window(&mappings(), &generated.notifications)
        .await
        .unwrap();
    assert!(report.is_clean());

    let snapshot = reconciler.stats().snapshot();
    assert_eq!(snapshot.keys_excluded, 2);
    assert_eq!(snapshot.pairs_matched, 2);
}
