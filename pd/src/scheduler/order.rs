//! Iteration ordering policy

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use tracing::debug;

use super::RetryTable;
use crate::domain::RepoRecord;

/// Compute the order in which to visit the working set
///
/// Repositories with a table entry come first, stable-sorted ascending by
/// deadline, so overdue and urgent work is attempted before anything that
/// still has time remaining. Repositories without an entry are due
/// immediately but keep their natural order after the sorted entries.
///
/// Cold start is the one exception: with no deadline information at all,
/// the set is shuffled once so many scheduler instances sharing a large
/// catalog disperse their initial load instead of herding through it in
/// the same fixed order. Every later pass sorts deterministically.
pub fn execution_order(mut repos: Vec<RepoRecord>, table: &RetryTable) -> Vec<RepoRecord> {
    if table.is_empty() {
        debug!(count = repos.len(), "execution_order: cold start, shuffling");
        let mut rng = rand::rng();
        repos.shuffle(&mut rng);
        return repos;
    }

    repos.sort_by_key(|repo| table.deadline(&repo.id).unwrap_or(DateTime::<Utc>::MAX_UTC));
    repos
}
