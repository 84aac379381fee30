//! Scheduler core - the pull loop
//!
//! One cooperative loop: resolve the working set, reconcile the retry
//! table, order, pull everything that is due, then sleep interruptibly
//! until the next deadline. Nothing raised while visiting a repository
//! escapes the per-repository boundary; the only exits are a shutdown
//! signal or a fatal working-set resolution error.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::directory::{RepoDirectory, SignalSource, resolve_working_set};
use crate::domain::{IterationSummary, PullOptions, RepoRecord};
use crate::heartbeat::Heartbeat;
use crate::puller::PullRunner;

use super::{RetryTable, SchedulerConfig, execution_order};

/// Why the interruptible wait returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    /// The computed deadline arrived
    Deadline,
    /// An urgent signal appeared mid-sleep
    Urgent,
    /// Shutdown was requested
    Shutdown,
}

/// The scheduling loop and its collaborators
pub struct PullScheduler {
    config: SchedulerConfig,
    directory: Arc<dyn RepoDirectory>,
    signals: Arc<dyn SignalSource>,
    runner: Arc<dyn PullRunner>,
    heartbeat: Arc<dyn Heartbeat>,
    include: Option<Vec<String>>,
    exclude: Vec<String>,
    options: PullOptions,
}

impl PullScheduler {
    /// Create a scheduler over the given collaborators
    pub fn new(
        config: SchedulerConfig,
        directory: Arc<dyn RepoDirectory>,
        signals: Arc<dyn SignalSource>,
        runner: Arc<dyn PullRunner>,
        heartbeat: Arc<dyn Heartbeat>,
    ) -> Self {
        Self {
            config,
            directory,
            signals,
            runner,
            heartbeat,
            include: None,
            exclude: Vec::new(),
            options: PullOptions::default(),
        }
    }

    /// Restrict the working set to named repositories and/or exclude names
    pub fn with_filters(mut self, include: Option<Vec<String>>, exclude: Vec<String>) -> Self {
        self.include = include;
        self.exclude = exclude;
        self
    }

    /// Set the options forwarded to the updater
    pub fn with_pull_options(mut self, options: PullOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the loop until shutdown
    ///
    /// A `NotFound` for an explicitly named repository propagates out and
    /// ends the run; per-repository pull failures never do.
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        info!(
            min_interval_secs = self.config.min_interval_secs,
            include = ?self.include,
            exclude = ?self.exclude,
            "Pull scheduler starting"
        );

        let mut table = RetryTable::new();

        loop {
            let summary = self.run_once(&mut table).await?;
            debug!(?summary, entries = table.len(), "run: iteration complete");

            let wake_at = table.next_wake(Utc::now(), self.config.min_interval());
            match self.wait_until(wake_at, &mut shutdown_rx).await {
                Wake::Shutdown => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
                Wake::Urgent => debug!("run: woken early by urgent signal"),
                Wake::Deadline => {}
            }
        }

        Ok(())
    }

    /// Run a single full pass over the working set
    ///
    /// The retry table is threaded in and out explicitly so one-shot runs
    /// and tests can feed synthetic (set, signals, table) states.
    pub async fn run_once(&self, table: &mut RetryTable) -> Result<IterationSummary> {
        let working = resolve_working_set(self.directory.as_ref(), self.include.as_deref(), &self.exclude)?;
        let signals = self.signals.pending()?;

        table.reconcile(&working, &signals, Utc::now());
        let ordered = execution_order(working, table);

        let mut summary = IterationSummary::default();
        for repo in &ordered {
            self.visit(repo, table, &mut summary).await;
            if let Err(e) = self.heartbeat.beat() {
                warn!(error = %e, "Heartbeat failed");
            }
        }

        Ok(summary)
    }

    /// Visit one repository: skip it or pull it, and update its deadline
    async fn visit(&self, repo: &RepoRecord, table: &mut RetryTable, summary: &mut IterationSummary) {
        summary.seen += 1;

        if !repo.tracked {
            debug!(repo = %repo.name, "visit: untracked, skipping");
            summary.skipped += 1;
            return;
        }

        if !table.is_due(&repo.id, Utc::now()) {
            summary.skipped += 1;
            return;
        }

        match self.runner.pull(repo, &self.options).await {
            Ok(report) => {
                if !report.stderr.trim().is_empty() {
                    warn!(repo = %repo.name, output = %report.stderr.trim(), "Updater produced unexpected output");
                }

                // Next interval counts from the end of the pull, using the
                // repository's own interval when it has one.
                let interval = repo
                    .pull_interval_secs
                    .map(|secs| Duration::seconds(secs as i64))
                    .unwrap_or_else(|| self.config.min_interval());
                table.schedule(repo.id.clone(), Utc::now() + interval);

                if let Err(e) = self.signals.clear(&repo.id) {
                    warn!(repo = %repo.name, error = %e, "Failed to clear urgent signals");
                }

                summary.pulled += 1;
                info!(repo = %repo.name, "Pull complete");
            }
            Err(e) => {
                // Failed repositories retry after the global minimum, not
                // their configured interval, so they are not stuck waiting
                // out a long schedule.
                error!(repo = %repo.name, error = %e, "Pull failed");
                table.schedule(repo.id.clone(), Utc::now() + self.config.min_interval());
                summary.failed += 1;
            }
        }
    }

    /// Sleep until `deadline` in short increments, polling the urgent
    /// signal source on each one and returning early when a signal appears
    /// or shutdown is requested.
    async fn wait_until(&self, deadline: DateTime<Utc>, shutdown_rx: &mut mpsc::Receiver<()>) -> Wake {
        let increment = self.config.sleep_increment();

        loop {
            let now = Utc::now();
            if now >= deadline {
                return Wake::Deadline;
            }

            let remaining = (deadline - now).to_std().unwrap_or_default();
            let step = remaining.min(increment);

            tokio::select! {
                _ = tokio::time::sleep(step) => {
                    match self.signals.pending() {
                        Ok(pending) if !pending.is_empty() => {
                            debug!(count = pending.len(), "wait_until: urgent signal, waking early");
                            return Wake::Urgent;
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "wait_until: failed to poll urgent signals"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    return Wake::Shutdown;
                }
            }
        }
    }
}
