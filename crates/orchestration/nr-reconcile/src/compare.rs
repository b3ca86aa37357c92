//! Structural comparison of notifications.

use nr_error::{MismatchError, NotificationMismatch, PairMismatch};
use nr_types::Notification;
use tracing::{debug, warn};

use crate::diff::multiset_diff;

/// Check that every file of a notification lives under its first file's
/// release directory.
///
/// An empty file list fails with an empty prefix.
pub fn check_prefix(notification: &Notification) -> Result<String, NotificationMismatch> {
    let (prefix, offending) = notification.files_outside_prefix();
    if prefix.is_empty() || !offending.is_empty() {
        return Err(NotificationMismatch::PrefixInconsistency { prefix, offending });
    }
    Ok(prefix)
}

/// Compare an expected notification with an actual one.
///
/// Checks run in order and the first failure is returned:
/// release date, prefix consistency of `expected`, then the sorted file
/// lists as multisets. Buckets are not compared.
pub fn compare(expected: &Notification, actual: &Notification) -> Result<(), NotificationMismatch> {
    if expected.release_date != actual.release_date {
        return Err(NotificationMismatch::ReleaseDateMismatch {
            expected: expected.release_date.clone(),
            actual: actual.release_date.clone(),
        });
    }

    check_prefix(expected)?;

    let diff = multiset_diff(&expected.sorted_files(), &actual.sorted_files());
    if !diff.is_empty() {
        return Err(NotificationMismatch::FileListMismatch {
            only_in_expected: diff.only_in_a,
            only_in_actual: diff.only_in_b,
        });
    }

    Ok(())
}

/// Compare two lists positionally, returning every pair's outcome.
///
/// # Errors
///
/// [`MismatchError::LengthMismatch`] if the lists differ in length.
pub fn compare_pairs(
    expecteds: &[Notification],
    actuals: &[Notification],
) -> Result<Vec<Result<(), NotificationMismatch>>, MismatchError> {
    if expecteds.len() != actuals.len() {
        return Err(MismatchError::LengthMismatch {
            expected: expecteds.len(),
            actual: actuals.len(),
        });
    }

    Ok(expecteds
        .iter()
        .zip(actuals)
        .map(|(expected, actual)| compare(expected, actual))
        .collect())
}

/// Compare two lists positionally and fail if any pair differs.
///
/// All pairs are checked; the error carries every mismatching pair.
pub fn compare_many(
    expecteds: &[Notification],
    actuals: &[Notification],
) -> Result<(), MismatchError> {
    let outcomes = compare_pairs(expecteds, actuals)?;
    let total = outcomes.len();

    let mismatches: Vec<PairMismatch> = outcomes
        .into_iter()
        .enumerate()
        .filter_map(|(index, outcome)| {
            outcome.err().map(|cause| PairMismatch {
                index,
                release_date: expecteds[index].release_date.clone(),
                cause,
            })
        })
        .collect();

    if mismatches.is_empty() {
        debug!(total, "All notification pairs match");
        return Ok(());
    }

    for mismatch in &mismatches {
        warn!(
            index = mismatch.index,
            release_date = %mismatch.release_date,
            cause = %mismatch.cause,
            "Notification pair mismatch"
        );
    }

    Err(MismatchError::Batch { total, mismatches })
}
