//! RepoStore - repository catalog and urgent-signal store
//!
//! Persists the set of managed repositories (name, tracked flag, optional
//! pull interval) and the queue of pending urgent-update signals in a single
//! SQLite database. The pull daemon reads both every scheduling iteration;
//! operators manage them through the `repostore` CLI.
//!
//! # Architecture
//!
//! ```text
//! catalog.db
//! ├── repos            # id, name, tracked, pull_interval_secs, created_at
//! └── urgent_signals   # repo_id, raised_at
//! ```
//!
//! # Example
//!
//! ```ignore
//! use repostore::Catalog;
//!
//! let catalog = Catalog::open("catalog.db")?;
//! catalog.add_repo("linux", Some(300))?;
//! catalog.raise_signal("linux")?;
//! let handles = catalog.resolve(None)?;
//! let pending = catalog.pending_signals()?;
//! ```

pub mod cli;
pub mod config;
mod store;

pub use store::{Catalog, CatalogError, RepoId, RepoRecord, SignalRecord};

use std::path::PathBuf;

/// Default catalog database location
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("repostore")
        .join("catalog.db")
}
