//! CLI argument parsing for repostore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "repostore")]
#[command(author, version, about = "Repository catalog and urgent-signal store", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a repository to the catalog
    Add {
        /// Repository name (must be unique)
        #[arg(required = true)]
        name: String,

        /// Minimum pull interval in seconds (default: the daemon's global minimum)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// List all repositories
    List,

    /// Mark a repository as tracked (eligible for scheduling)
    Track {
        /// Repository name
        #[arg(required = true)]
        name: String,
    },

    /// Mark a repository as untracked (never scheduled)
    Untrack {
        /// Repository name
        #[arg(required = true)]
        name: String,
    },

    /// Set or clear a repository's pull interval
    Interval {
        /// Repository name
        #[arg(required = true)]
        name: String,

        /// Interval in seconds (omit to fall back to the global minimum)
        secs: Option<u64>,
    },

    /// Remove a repository and its pending signals
    Remove {
        /// Repository name
        #[arg(required = true)]
        name: String,
    },

    /// Raise an urgent-update signal for a repository
    Signal {
        /// Repository name
        #[arg(required = true)]
        name: String,
    },

    /// List pending urgent signals
    Signals,

    /// Clear pending signals for a repository
    Clear {
        /// Repository name
        #[arg(required = true)]
        name: String,
    },
}
