//! Release directory mappings.

use serde::{Deserialize, Serialize};

use crate::notification::Notification;
use crate::release_key::normalize_prefix;

/// Authoritative mapping from a logical release to its bucket directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseMapping {
    /// Release date recorded for the directory
    pub release_date: String,

    /// Directory prefix in the bucket (with or without trailing `/`)
    pub release_dir: String,
}

impl ReleaseMapping {
    /// Create a new mapping.
    pub fn new(release_date: impl Into<String>, release_dir: impl Into<String>) -> Self {
        Self {
            release_date: release_date.into(),
            release_dir: release_dir.into(),
        }
    }

    /// Derive a mapping from a trusted notification.
    ///
    /// Returns `None` if the notification has no files.
    pub fn from_notification(notification: &Notification) -> Option<Self> {
        notification
            .release_dir()
            .map(|dir| Self::new(notification.release_date.clone(), dir))
    }

    /// Directory prefix normalized to end with `/`.
    pub fn prefix(&self) -> String {
        normalize_prefix(&self.release_dir)
    }
}
