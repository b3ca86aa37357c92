//! Configuration types for reconciliation runs.

use chrono::NaiveDate;
use nr_error::{FormatError, NrError, Result};
use nr_types::{Notification, ReleaseMapping};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::counts::DEFAULT_COUNT_CONCURRENCY;

/// Configuration for a [`crate::Reconciler`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Bucket holding the releases named by mappings
    pub bucket: String,

    /// Number of objects counted concurrently
    pub count_concurrency: usize,

    /// Directory for locally cached objects (no caching when unset)
    pub cache_dir: Option<PathBuf>,

    /// Append-only log of excluded keys (not written when unset)
    pub exclusions_log: Option<PathBuf>,

    /// Fail a release whose marker date differs from its mapping's date
    pub verify_mapping_dates: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            count_concurrency: DEFAULT_COUNT_CONCURRENCY,
            cache_dir: None,
            exclusions_log: None,
            verify_mapping_dates: true,
        }
    }
}

impl ReconcileConfig {
    /// Create a configuration for `bucket` with defaults.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set the count concurrency.
    pub fn with_count_concurrency(mut self, concurrency: usize) -> Self {
        self.count_concurrency = concurrency;
        self
    }

    /// Cache downloaded objects under `dir`.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Append excluded keys to `path`.
    pub fn with_exclusions_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclusions_log = Some(path.into());
        self
    }

    /// Enable or disable the mapping date check.
    pub fn with_verify_mapping_dates(mut self, verify: bool) -> Self {
        self.verify_mapping_dates = verify;
        self
    }

    /// Check the configuration is usable.
    ///
    /// The bucket may be empty when every release is taken from received
    /// notifications, which carry their own bucket.
    pub fn validate(&self) -> Result<()> {
        if self.count_concurrency == 0 {
            return Err(NrError::Config(
                "count concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Inclusive range of release dates.
///
/// Release dates are ISO `YYYY-MM-DD` strings. An unbounded window accepts
/// every release without parsing its date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseWindow {
    /// First release date included
    pub from: Option<NaiveDate>,

    /// Last release date included
    pub to: Option<NaiveDate>,
}

impl ReleaseWindow {
    /// Window accepting every release.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Build a window from optional date strings.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let window = Self {
            from: from.map(parse_release_date).transpose()?,
            to: to.map(parse_release_date).transpose()?,
        };
        if let (Some(from), Some(to)) = (window.from, window.to) {
            if from > to {
                return Err(NrError::Config(format!(
                    "release window start {from} is after its end {to}"
                )));
            }
        }
        Ok(window)
    }

    /// Whether the window has any bound.
    pub fn is_bounded(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// Whether a release date falls inside the window.
    pub fn contains(&self, release_date: &str) -> Result<bool> {
        if !self.is_bounded() {
            return Ok(true);
        }
        let date = parse_release_date(release_date)?;
        Ok(self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to))
    }

    /// Keep mappings whose release date is inside the window, in order.
    pub fn filter(&self, mappings: Vec<ReleaseMapping>) -> Result<Vec<ReleaseMapping>> {
        let mut kept = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            if self.contains(&mapping.release_date)? {
                kept.push(mapping);
            }
        }
        Ok(kept)
    }

    /// Keep notifications whose release date is inside the window, in order.
    ///
    /// Applied to both sides of a positional pairing, this keeps the pairs
    /// aligned as long as paired entries share a release date.
    pub fn filter_notifications(&self, notifications: Vec<Notification>) -> Result<Vec<Notification>> {
        let mut kept = Vec::with_capacity(notifications.len());
        for notification in notifications {
            if self.contains(&notification.release_date)? {
                kept.push(notification);
            }
        }
        Ok(kept)
    }
}

/// Parse a `YYYY-MM-DD` release date.
pub fn parse_release_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        FormatError::InvalidDate {
            value: value.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
