//! PullDaemon - repository pull scheduler
//!
//! A long-running daemon that decides, continuously, which repository in a
//! catalog should next be pulled. It respects per-repository minimum
//! intervals, preempts for urgent-update signals, backs off failing
//! repositories, and sleeps interruptibly between passes so urgent work is
//! never delayed by more than one wait increment.
//!
//! # Core Concepts
//!
//! - **Explicit retry state**: the next-eligible-time table is a value
//!   threaded through the loop, rebuilt from the catalog every iteration
//! - **Soft priority**: soonest-deadline-first ordering, not a hard queue
//! - **External updater**: pulls happen by shelling out; the daemon only
//!   schedules them
//! - **Failure never escapes**: one repository's failure reschedules that
//!   repository and nothing else
//!
//! # Modules
//!
//! - [`scheduler`] - retry table, ordering, and the pull loop
//! - [`directory`] - working-set resolution over the catalog
//! - [`puller`] - external updater invocation
//! - [`heartbeat`] - liveness signalling for the process supervisor
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//! - [`daemon`] - PID file and process management

pub mod cli;
pub mod config;
pub mod daemon;
pub mod directory;
pub mod domain;
pub mod heartbeat;
pub mod puller;
pub mod scheduler;

// Re-export commonly used types
pub use config::{CatalogConfig, Config, UpdaterConfig};
pub use daemon::{DaemonManager, DaemonStatus};
pub use directory::{CatalogDirectory, DirectoryError, RepoDirectory, SignalSource, resolve_working_set};
pub use domain::{IterationSummary, PullOptions, PullReport, RepoId, RepoRecord, SignalRecord};
pub use heartbeat::{FileHeartbeat, Heartbeat, NullHeartbeat};
pub use puller::{CommandPuller, PullError, PullRunner};
pub use scheduler::{PullScheduler, RetryTable, SchedulerConfig, execution_order};
