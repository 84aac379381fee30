//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::DEFAULT_UPDATER;

/// PullDaemon - repository pull scheduler
#[derive(Parser)]
#[command(
    name = "pd",
    about = "Repository pull scheduler daemon",
    version,
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Repository selection and updater options shared by the scheduling commands
#[derive(Debug, Clone, Default, Args)]
pub struct PullArgs {
    /// Skip the updater's discovery sub-step
    #[arg(long = "skip-discovery")]
    pub skip_discovery: bool,

    /// Repository names to exclude (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Repository names to pull exclusively (default: all repositories)
    #[arg(value_name = "REPOS")]
    pub repos: Vec<String>,
}

impl PullArgs {
    /// The inclusion list, or None for "all repositories"
    pub fn include(&self) -> Option<Vec<String>> {
        if self.repos.is_empty() {
            None
        } else {
            Some(self.repos.clone())
        }
    }

    /// Re-serialize into arguments for the spawned daemon process
    pub fn forward_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.skip_discovery {
            args.push("--skip-discovery".to_string());
        }
        for name in &self.exclude {
            args.push("--exclude".to_string());
            args.push(name.clone());
        }
        args.extend(self.repos.iter().cloned());
        args
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the pull daemon
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Run a single scheduling pass and exit
    Once {
        #[command(flatten)]
        pull: PullArgs,
    },

    /// Internal: Run as daemon process (used by `daemon start`)
    #[command(hide = true)]
    RunDaemon {
        #[command(flatten)]
        pull: PullArgs,
    },

    /// Show daemon logs
    Logs {
        /// Follow log output (like tail -f)
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short, long, default_value = "50")]
        lines: usize,
    },
}

/// Daemon management subcommands
#[derive(Debug, Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon
    Start {
        /// Don't fork to background (run in foreground)
        #[arg(long)]
        foreground: bool,

        #[command(flatten)]
        pull: PullArgs,
    },

    /// Stop the daemon
    Stop,

    /// Check daemon status
    Status {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Result of checking a required tool
pub struct ToolCheck {
    pub name: &'static str,
    pub available: bool,
    pub version: Option<String>,
}

impl ToolCheck {
    /// Check if a tool is available and get its version
    pub fn check(name: &'static str, version_args: &[&str]) -> Self {
        debug!(name, ?version_args, "ToolCheck::check: called");
        let result = std::process::Command::new(name).args(version_args).output();

        match result {
            Ok(output) if output.status.success() => {
                debug!(name, "ToolCheck::check: tool available");
                let version_str = String::from_utf8_lossy(&output.stdout);
                let version = parse_version(&version_str);
                Self {
                    name,
                    available: true,
                    version: Some(version),
                }
            }
            _ => {
                debug!(name, "ToolCheck::check: tool not available");
                Self {
                    name,
                    available: false,
                    version: None,
                }
            }
        }
    }
}

/// Parse version from command output (extracts first version-like string)
fn parse_version(output: &str) -> String {
    for word in output.split_whitespace() {
        let word = word.trim_start_matches('v');
        if word.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            // Take until non-version character
            let version: String = word.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
            if !version.is_empty() {
                return version;
            }
        }
    }
    "unknown".to_string()
}

/// Check all required tools and return their status
pub fn check_required_tools() -> Vec<ToolCheck> {
    vec![ToolCheck::check(DEFAULT_UPDATER, &["--version"])]
}

/// Check if the daemon is running (lightweight check for help display)
pub fn is_daemon_running() -> bool {
    // Use the same path logic as daemon.rs:default_pid_path()
    let pid_file = dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("pulldaemon")
        .join("pulldaemon.pid");

    if !pid_file.exists() {
        return false;
    }

    if let Ok(contents) = std::fs::read_to_string(&pid_file)
        && let Ok(pid) = contents.trim().parse::<u32>()
    {
        // Check if process exists
        return PathBuf::from(format!("/proc/{}", pid)).exists();
    }

    false
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pulldaemon")
        .join("logs")
        .join("pulldaemon.log")
}

/// Generate the after_help text with tool checks and daemon status
pub fn generate_after_help() -> String {
    let tools = check_required_tools();
    let daemon_running = is_daemon_running();
    let log_path = get_log_path();

    let mut help = String::new();

    // Required Tools section
    help.push_str("Required Tools:\n");
    for tool in &tools {
        let icon = if tool.available { "\u{2705}" } else { "\u{274C}" };
        let version = tool.version.as_deref().unwrap_or("not found");
        help.push_str(&format!("  {} {:<14} {}\n", icon, tool.name, version));
    }

    // Daemon section
    help.push('\n');
    help.push_str("Daemon:\n");
    let daemon_icon = if daemon_running { "\u{2705}" } else { "\u{274C}" };
    let daemon_status = if daemon_running { "running" } else { "stopped" };
    help.push_str(&format!("  {} {}\n", daemon_icon, daemon_status));

    // Log path
    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", log_path.display()));

    help
}

/// Output format for the status command
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
