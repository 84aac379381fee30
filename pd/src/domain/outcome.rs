//! Per-iteration value types

use serde::{Deserialize, Serialize};

/// Options passed through to the external updater
#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    /// Skip the updater's discovery sub-step
    pub skip_discovery: bool,
}

/// Captured output of one successful updater invocation
///
/// A non-empty `stderr` on a successful exit is advisory: the scheduler
/// surfaces it as a warning but the pull still counts as a success.
#[derive(Debug, Clone)]
pub struct PullReport {
    pub stdout: String,
    pub stderr: String,
}

/// Counters for one full pass over the working set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationSummary {
    /// Repositories visited (including skips)
    pub seen: usize,
    /// Pulls that completed successfully
    pub pulled: usize,
    /// Pulls that failed and were rescheduled with the global backoff
    pub failed: usize,
    /// Repositories skipped (untracked, or deadline still in the future)
    pub skipped: usize,
}
