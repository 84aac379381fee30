//! Retry-deadline bookkeeping
//!
//! Maps each repository in the working set to the absolute time before
//! which it must not be re-attempted. The table is an explicit value owned
//! by the loop and threaded from one iteration to the next; a restart
//! resets it, which makes every repository immediately eligible again.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{RepoId, RepoRecord, SignalRecord};

/// Next-eligible-time table, keyed by repository identifier
///
/// A repository absent from the table is eligible immediately.
#[derive(Debug, Clone, Default)]
pub struct RetryTable {
    entries: BTreeMap<RepoId, DateTime<Utc>>,
}

impl RetryTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The deadline recorded for a repository, if any
    pub fn deadline(&self, id: &str) -> Option<DateTime<Utc>> {
        self.entries.get(id).copied()
    }

    /// Whether a repository may be attempted at `now`
    ///
    /// Missing entries are due immediately.
    pub fn is_due(&self, id: &str, now: DateTime<Utc>) -> bool {
        self.deadline(id).is_none_or(|deadline| deadline <= now)
    }

    /// Record the next eligible time for a repository
    pub fn schedule(&mut self, id: impl Into<RepoId>, at: DateTime<Utc>) {
        self.entries.insert(id.into(), at);
    }

    /// Reconcile the table against the current working set and urgent signals
    ///
    /// Urgent signals unconditionally pull the repository's deadline to
    /// `now` (inserting an entry if absent), then every entry whose
    /// repository is no longer in the working set is removed. Runs every
    /// iteration: signals and deletions are only detected here.
    pub fn reconcile(&mut self, working_set: &[RepoRecord], signals: &[SignalRecord], now: DateTime<Utc>) {
        for signal in signals {
            debug!(repo_id = %signal.repo_id, "reconcile: urgent signal, deadline set to now");
            self.entries.insert(signal.repo_id.clone(), now);
        }

        let live: HashSet<&str> = working_set.iter().map(|r| r.id.as_str()).collect();
        let before = self.entries.len();
        self.entries.retain(|id, _| live.contains(id.as_str()));
        let pruned = before - self.entries.len();
        if pruned > 0 {
            debug!(pruned, "reconcile: removed entries for absent repositories");
        }
    }

    /// The soonest deadline across the table, if any
    pub fn earliest(&self) -> Option<DateTime<Utc>> {
        self.entries.values().min().copied()
    }

    /// Compute the next wake time after a full pass
    ///
    /// `max(earliest deadline, now + min_interval)` — the lower bound keeps
    /// an all-overdue table from turning the loop into a busy spin.
    pub fn next_wake(&self, now: DateTime<Utc>, min_interval: chrono::Duration) -> DateTime<Utc> {
        let floor = now + min_interval;
        match self.earliest() {
            Some(deadline) => deadline.max(floor),
            None => floor,
        }
    }

    /// Number of entries in the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no deadline information at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a repository has an entry
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn repo(name: &str) -> RepoRecord {
        RepoRecord {
            id: format!("{}-id", name),
            name: name.to_string(),
            tracked: true,
            pull_interval_secs: None,
            created_at: Utc::now(),
        }
    }

    fn signal(repo: &RepoRecord) -> SignalRecord {
        SignalRecord {
            repo_id: repo.id.clone(),
            raised_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_entry_is_due_now() {
        let table = RetryTable::new();
        assert!(table.is_due("anything", Utc::now()));
    }

    #[test]
    fn test_future_deadline_is_not_due() {
        let now = Utc::now();
        let mut table = RetryTable::new();
        table.schedule("a-id", now + Duration::seconds(60));

        assert!(!table.is_due("a-id", now));
        assert!(table.is_due("a-id", now + Duration::seconds(61)));
    }

    #[test]
    fn test_urgent_signal_overrides_later_deadline() {
        let now = Utc::now();
        let a = repo("a");
        let mut table = RetryTable::new();
        table.schedule(a.id.clone(), now + Duration::seconds(300));

        table.reconcile(std::slice::from_ref(&a), &[signal(&a)], now);

        assert_eq!(table.deadline(&a.id), Some(now));
        assert!(table.is_due(&a.id, now));
    }

    #[test]
    fn test_urgent_signal_inserts_missing_entry() {
        let now = Utc::now();
        let a = repo("a");
        let mut table = RetryTable::new();

        table.reconcile(std::slice::from_ref(&a), &[signal(&a)], now);

        assert_eq!(table.deadline(&a.id), Some(now));
    }

    #[test]
    fn test_reconcile_prunes_absent_repositories() {
        let now = Utc::now();
        let a = repo("a");
        let mut table = RetryTable::new();
        table.schedule(a.id.clone(), now + Duration::seconds(60));
        table.schedule("gone-id", now + Duration::seconds(60));

        table.reconcile(std::slice::from_ref(&a), &[], now);

        assert!(table.contains(&a.id));
        assert!(!table.contains("gone-id"));
    }

    #[test]
    fn test_signal_for_removed_repo_is_pruned() {
        // Signals are applied first, then pruning removes entries for
        // repositories no longer in the working set.
        let now = Utc::now();
        let gone = repo("gone");
        let mut table = RetryTable::new();

        table.reconcile(&[], &[signal(&gone)], now);

        assert!(!table.contains(&gone.id));
        assert!(table.is_empty());
    }

    #[test]
    fn test_next_wake_floors_at_min_interval() {
        let now = Utc::now();
        let min = Duration::seconds(15);
        let mut table = RetryTable::new();

        // Empty table: floor applies
        assert_eq!(table.next_wake(now, min), now + min);

        // Everything overdue: floor still applies
        table.schedule("a-id", now - Duration::seconds(100));
        assert_eq!(table.next_wake(now, min), now + min);
    }

    #[test]
    fn test_next_wake_matches_earliest_future_deadline() {
        let now = Utc::now();
        let min = Duration::seconds(15);
        let mut table = RetryTable::new();
        table.schedule("a-id", now + Duration::seconds(300));
        table.schedule("b-id", now + Duration::seconds(60));

        assert_eq!(table.next_wake(now, min), now + Duration::seconds(60));
    }
}
