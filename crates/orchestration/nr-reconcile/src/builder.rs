//! Notification assembly from bucket state.

use nr_error::Result;
use nr_traits::ObjectStore;
use nr_types::Notification;

use crate::classify::PathClassifier;
use crate::locate::locate;

/// Build the notification for one release prefix.
///
/// Rebuilding against an unchanged prefix yields an equal notification.
pub async fn build_notification(
    store: &dyn ObjectStore,
    classifier: &PathClassifier,
    bucket: &str,
    release_prefix: &str,
) -> Result<Notification> {
    let located = locate(store, classifier, bucket, release_prefix).await?;
    Ok(Notification::new(located.release_date, bucket, located.files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nr_traits::MemoryStore;

    #[tokio::test]
    async fn test_build_is_idempotent() {
        let store = MemoryStore::new();
        store.put("bucket", "rel1/variation/deleted/0000", "{}\n");
        store.put("bucket", "rel1/gene/updated/0000", "{}\n");
        store.put("bucket", "rel1/release_date.txt", "2022-04-03\n");
        let classifier = PathClassifier::default();

        let first = build_notification(&store, &classifier, "bucket", "rel1")
            .await
            .unwrap();
        let second = build_notification(&store, &classifier, "bucket", "rel1")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.bucket, "bucket");
        assert_eq!(first.release_date, "2022-04-03");
        assert_eq!(first.files.len(), 3);
    }
}
