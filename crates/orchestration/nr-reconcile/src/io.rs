//! Mapping, notification and report files.
//!
//! - Mapping files hold one `release_date<whitespace>release_dir` pair per
//!   line and are written with a fixed four-space separator.
//! - Notification files are newline-delimited JSON, one notification per
//!   line with keys in `release_date`, `bucket`, `files` order.
//!
//! Blank lines are skipped when reading either format.

use nr_error::{FormatError, Result};
use nr_types::{Notification, ReleaseMapping};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Separator written between the two fields of a mapping line.
pub const MAPPING_SEPARATOR: &str = "    ";

/// Parse mapping file content.
pub fn parse_mappings(content: &str) -> Result<Vec<ReleaseMapping>> {
    let mut mappings = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields[..] {
            [] => continue,
            [release_date, release_dir] => {
                mappings.push(ReleaseMapping::new(release_date, release_dir));
            }
            _ => {
                return Err(FormatError::MappingLine {
                    line: index + 1,
                    content: line.to_string(),
                }
                .into());
            }
        }
    }
    Ok(mappings)
}

/// Render mappings as file content.
pub fn format_mappings(mappings: &[ReleaseMapping]) -> String {
    mappings
        .iter()
        .map(|m| format!("{}{MAPPING_SEPARATOR}{}\n", m.release_date, m.release_dir))
        .collect()
}

/// Parse newline-delimited notification JSON.
pub fn parse_notifications(content: &str) -> Result<Vec<Notification>> {
    let mut notifications = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let notification: Notification = serde_json::from_str(line).map_err(|source| {
            FormatError::NotificationLine {
                line: index + 1,
                source,
            }
        })?;
        notifications.push(notification);
    }
    Ok(notifications)
}

/// Render notifications as newline-delimited JSON.
pub fn format_notifications(notifications: &[Notification]) -> Result<String> {
    let mut out = String::new();
    for notification in notifications {
        out.push_str(&serde_json::to_string(notification)?);
        out.push('\n');
    }
    Ok(out)
}

/// Read a mapping file.
pub async fn read_mappings(path: impl AsRef<Path>) -> Result<Vec<ReleaseMapping>> {
    let path = path.as_ref();
    let mappings = parse_mappings(&tokio::fs::read_to_string(path).await?)?;
    debug!(path = %path.display(), mappings = mappings.len(), "Read release mappings");
    Ok(mappings)
}

/// Write a mapping file, replacing any existing content.
pub async fn write_mappings(path: impl AsRef<Path>, mappings: &[ReleaseMapping]) -> Result<()> {
    tokio::fs::write(path, format_mappings(mappings)).await?;
    Ok(())
}

/// Read a notification file.
pub async fn read_notifications(path: impl AsRef<Path>) -> Result<Vec<Notification>> {
    let path = path.as_ref();
    let notifications = parse_notifications(&tokio::fs::read_to_string(path).await?)?;
    debug!(path = %path.display(), notifications = notifications.len(), "Read notifications");
    Ok(notifications)
}

/// Write a notification file, replacing any existing content.
pub async fn write_notifications(
    path: impl AsRef<Path>,
    notifications: &[Notification],
) -> Result<()> {
    tokio::fs::write(path, format_notifications(notifications)?).await?;
    Ok(())
}

/// Write any serializable report as pretty-printed JSON.
pub async fn write_json_report<T: Serialize + ?Sized>(path: impl AsRef<Path>, report: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    tokio::fs::write(path, json).await?;
    Ok(())
}
