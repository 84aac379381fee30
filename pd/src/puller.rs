//! External updater invocation
//!
//! The daemon never synchronizes a repository itself; it shells out to a
//! configured updater binary and classifies the outcome from the exit
//! status and captured output.

use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::config::UpdaterConfig;
use crate::domain::{PullOptions, PullReport, RepoRecord};

/// Errors produced by an updater invocation
#[derive(Debug, Error)]
pub enum PullError {
    /// The updater binary could not be launched at all
    #[error("failed to launch updater '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// The updater ran but reported failure
    #[error("updater failed for '{name}': {detail}")]
    Failed { name: String, detail: String },
}

/// Performs the synchronization for one repository
#[async_trait]
pub trait PullRunner: Send + Sync {
    /// Pull one repository; awaited to completion by the scheduler loop.
    async fn pull(&self, repo: &RepoRecord, options: &PullOptions) -> Result<PullReport, PullError>;
}

/// Runs the configured external updater as a subprocess
///
/// Invocation shape: `<program> <extra-args..> update [--skip-discovery] <name>`.
/// Timeouts are the updater's responsibility, not the scheduler's.
pub struct CommandPuller {
    program: String,
    extra_args: Vec<String>,
}

impl CommandPuller {
    /// Build a puller from the updater configuration
    pub fn new(config: &UpdaterConfig) -> Self {
        Self {
            program: config.program.clone(),
            extra_args: config.extra_args.clone(),
        }
    }
}

#[async_trait]
impl PullRunner for CommandPuller {
    async fn pull(&self, repo: &RepoRecord, options: &PullOptions) -> Result<PullReport, PullError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args).arg("update");
        if options.skip_discovery {
            cmd.arg("--skip-discovery");
        }
        cmd.arg(&repo.name).stdout(Stdio::piped()).stderr(Stdio::piped());

        debug!(repo = %repo.name, program = %self.program, "pull: invoking updater");

        let output = cmd.output().await.map_err(|source| PullError::Spawn {
            command: self.program.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let detail = if stderr.trim().is_empty() {
                output.status.to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(PullError::Failed {
                name: repo.name.clone(),
                detail,
            });
        }

        debug!(repo = %repo.name, "pull: updater finished");
        Ok(PullReport { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn repo(name: &str) -> RepoRecord {
        RepoRecord {
            id: format!("{}-id", name),
            name: name.to_string(),
            tracked: true,
            pull_interval_secs: None,
            created_at: Utc::now(),
        }
    }

    fn puller(program: &str) -> CommandPuller {
        CommandPuller::new(&UpdaterConfig {
            program: program.to_string(),
            extra_args: vec![],
        })
    }

    #[tokio::test]
    async fn test_successful_pull_captures_output() {
        // echo prints its arguments and exits 0
        let report = puller("echo")
            .pull(&repo("myrepo"), &PullOptions::default())
            .await
            .unwrap();

        assert!(report.stdout.contains("update"));
        assert!(report.stdout.contains("myrepo"));
        assert!(report.stderr.trim().is_empty());
    }

    #[tokio::test]
    async fn test_skip_discovery_is_forwarded() {
        let options = PullOptions { skip_discovery: true };
        let report = puller("echo").pull(&repo("myrepo"), &options).await.unwrap();

        assert!(report.stdout.contains("--skip-discovery"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let err = puller("false")
            .pull(&repo("myrepo"), &PullOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PullError::Failed { ref name, .. } if name == "myrepo"));
    }

    #[tokio::test]
    async fn test_missing_updater_is_spawn_error() {
        let err = puller("definitely-not-a-real-updater-binary")
            .pull(&repo("myrepo"), &PullOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PullError::Spawn { .. }));
    }
}
