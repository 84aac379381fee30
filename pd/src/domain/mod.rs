//! Domain types for the pull daemon
//!
//! Repository handles and urgent signals come from the repostore catalog;
//! this module re-exports them alongside the daemon's own per-iteration
//! types (pull options, reports, iteration summaries).

mod outcome;

pub use outcome::{IterationSummary, PullOptions, PullReport};

// Re-export repostore types for convenience
pub use repostore::{RepoId, RepoRecord, SignalRecord};
