//! Daemon liveness signalling
//!
//! The scheduler beats once after every per-repository step so the process
//! supervisor can tell a long iteration from a hung daemon. The file-based
//! implementation writes a unix timestamp next to the PID file; `pd daemon
//! status` reports its age.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use eyre::{Context, Result};
use tracing::debug;

/// Liveness signal consumed by the process supervisor
pub trait Heartbeat: Send + Sync {
    /// Record that the loop is alive. Failures are advisory, never fatal.
    fn beat(&self) -> Result<()>;
}

/// Default heartbeat file location (alongside the PID file)
pub fn default_heartbeat_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("pulldaemon")
        .join("pulldaemon.heartbeat")
}

/// Writes the current unix timestamp to a liveness file on every beat
#[derive(Debug)]
pub struct FileHeartbeat {
    path: PathBuf,
}

impl FileHeartbeat {
    /// Create a heartbeat writing to the default location
    pub fn new() -> Self {
        Self {
            path: default_heartbeat_path(),
        }
    }

    /// Create a heartbeat writing to a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the timestamp of the last beat, if any
    pub fn last_beat(&self) -> Option<i64> {
        let contents = fs::read_to_string(&self.path).ok()?;
        contents.trim().parse().ok()
    }
}

impl Default for FileHeartbeat {
    fn default() -> Self {
        Self::new()
    }
}

impl Heartbeat for FileHeartbeat {
    fn beat(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create heartbeat directory")?;
        }
        fs::write(&self.path, Utc::now().timestamp().to_string()).context("Failed to write heartbeat file")?;
        debug!(path = ?self.path, "beat: heartbeat written");
        Ok(())
    }
}

/// No-op heartbeat for one-shot runs and tests
pub struct NullHeartbeat;

impl Heartbeat for NullHeartbeat {
    fn beat(&self) -> Result<()> {
        Ok(())
    }
}
