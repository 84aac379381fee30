//! PullDaemon - repository pull scheduler
//!
//! CLI entry point for running and managing the pull daemon.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use pulldaemon::cli::{Cli, Command, DaemonCommand, OutputFormat, PullArgs, generate_after_help, get_log_path};
use pulldaemon::config::Config;
use pulldaemon::daemon::DaemonManager;
use pulldaemon::directory::CatalogDirectory;
use pulldaemon::domain::PullOptions;
use pulldaemon::heartbeat::{FileHeartbeat, Heartbeat, NullHeartbeat};
use pulldaemon::puller::CommandPuller;
use pulldaemon::scheduler::{PullScheduler, RetryTable};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pulldaemon")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(log_dir.join("pulldaemon.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Build command with dynamic after_help that shows tool checks and daemon status
    let cmd = Cli::command().after_help(generate_after_help());

    // Parse CLI arguments using the modified command
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Dispatch command
    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Daemon { command } => match command {
            DaemonCommand::Start { foreground, pull } => cmd_start(&config, foreground, &pull).await,
            DaemonCommand::Stop => cmd_stop().await,
            DaemonCommand::Status { format } => cmd_status(format).await,
        },
        Command::Once { pull } => cmd_once(&config, &pull).await,
        Command::RunDaemon { pull } => cmd_run_daemon(&config, &pull).await,
        Command::Logs { follow, lines } => cmd_logs(follow, lines).await,
    }
}

/// Wire the scheduler to its production collaborators
fn build_scheduler(config: &Config, pull: &PullArgs, heartbeat: Arc<dyn Heartbeat>) -> Result<PullScheduler> {
    let directory = Arc::new(
        CatalogDirectory::open(&config.catalog.path)
            .context(format!("Failed to open catalog at {}", config.catalog.path.display()))?,
    );
    let runner = Arc::new(CommandPuller::new(&config.updater));

    let scheduler = PullScheduler::new(
        config.scheduler.clone(),
        directory.clone(),
        directory,
        runner,
        heartbeat,
    )
    .with_filters(pull.include(), pull.exclude.clone())
    .with_pull_options(PullOptions {
        skip_discovery: pull.skip_discovery,
    });

    Ok(scheduler)
}

/// Start the daemon
async fn cmd_start(config: &Config, foreground: bool, pull: &PullArgs) -> Result<()> {
    debug!(foreground, "cmd_start: called");
    let daemon = DaemonManager::new();

    if daemon.is_running() {
        if let Some(pid) = daemon.running_pid() {
            println!("PullDaemon is already running (PID: {})", pid);
        } else {
            println!("PullDaemon is already running");
        }
        return Ok(());
    }

    if foreground {
        println!("Starting PullDaemon in foreground mode...");
        run_daemon(config, pull).await
    } else {
        let pid = daemon.start(&pull.forward_args())?;
        println!("PullDaemon started (PID: {})", pid);
        Ok(())
    }
}

/// Stop the daemon
async fn cmd_stop() -> Result<()> {
    debug!("cmd_stop: called");
    let daemon = DaemonManager::new();

    if !daemon.is_running() {
        println!("PullDaemon is not running");
        return Ok(());
    }

    let pid = daemon.running_pid();
    daemon.stop()?;
    if let Some(pid) = pid {
        println!("PullDaemon stopped (was PID: {})", pid);
    } else {
        println!("PullDaemon stopped");
    }
    Ok(())
}

/// Show daemon status
async fn cmd_status(format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_status: called");
    let daemon = DaemonManager::new();
    let status = daemon.status();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "running": status.running,
                "pid": status.pid,
                "pid_file": status.pid_file.to_string_lossy(),
                "heartbeat_age_secs": status.heartbeat_age_secs,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("PullDaemon Status");
            println!("-----------------");
            if status.running {
                println!("Status: {}", "running".green());
                if let Some(pid) = status.pid {
                    println!("PID: {}", pid);
                }
            } else {
                println!("Status: {}", "stopped".dimmed());
            }
            println!("PID file: {}", status.pid_file.display());
            match status.heartbeat_age_secs {
                Some(age) => println!("Last heartbeat: {}s ago", age),
                None => println!("Last heartbeat: never"),
            }
        }
    }

    Ok(())
}

/// Run a single scheduling pass (batch mode)
async fn cmd_once(config: &Config, pull: &PullArgs) -> Result<()> {
    debug!("cmd_once: called");
    let scheduler = build_scheduler(config, pull, Arc::new(NullHeartbeat))?;
    let mut table = RetryTable::new();

    println!("Running one scheduling pass...");
    let summary = scheduler.run_once(&mut table).await?;

    if summary.failed > 0 {
        println!(
            "{} Pulled {}, failed {}, skipped {} (of {} seen)",
            "✗".red(),
            summary.pulled,
            summary.failed,
            summary.skipped,
            summary.seen
        );
        std::process::exit(1);
    }

    println!(
        "{} Pulled {}, skipped {} (of {} seen)",
        "✓".green(),
        summary.pulled,
        summary.skipped,
        summary.seen
    );
    Ok(())
}

/// Run as the daemon process (internal command)
async fn cmd_run_daemon(config: &Config, pull: &PullArgs) -> Result<()> {
    debug!("cmd_run_daemon: called");
    let daemon = DaemonManager::new();
    daemon.register_self()?;

    run_daemon(config, pull).await
}

/// Show logs
async fn cmd_logs(follow: bool, lines: usize) -> Result<()> {
    debug!(follow, lines, "cmd_logs: called");
    let log_path = get_log_path();

    if !log_path.exists() {
        println!("No log file found at: {}", log_path.display());
        println!("The daemon may not have been started yet.");
        return Ok(());
    }

    if follow {
        println!("Following log file: {} (Ctrl+C to stop)", log_path.display());
        println!();

        // Use tail -f for following
        let mut child = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(&log_path)
            .spawn()
            .context("Failed to run tail -f")?;

        child.wait()?;
    } else {
        // Read last N lines
        let file = fs::File::open(&log_path).context("Failed to open log file")?;
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        let start = if all_lines.len() > lines { all_lines.len() - lines } else { 0 };

        for line in &all_lines[start..] {
            println!("{}", line);
        }
    }

    Ok(())
}

/// Run the daemon main loop
async fn run_daemon(config: &Config, pull: &PullArgs) -> Result<()> {
    debug!("run_daemon: called");
    info!("Daemon starting...");

    let daemon = DaemonManager::new();
    let heartbeat = Arc::new(FileHeartbeat::with_path(daemon.heartbeat_file().clone()));

    // Opening the catalog is the fail-fast validation step: a missing or
    // unreadable database aborts before the loop starts.
    let scheduler = build_scheduler(config, pull, heartbeat)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let mut handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });
    info!("Scheduler started");

    info!("Daemon running. Press Ctrl+C to stop.");

    // Set up signal handlers
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                warn!("SIGINT received");
                let _ = shutdown_tx.send(()).await;
            }
            _ = sigterm.recv() => {
                warn!("SIGTERM received");
                let _ = shutdown_tx.send(()).await;
            }
            result = &mut handle => {
                // The loop only ends on its own for a fatal error (an
                // explicitly named repository that does not resolve)
                return result.context("Scheduler task panicked")?;
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("Ctrl+C received");
                let _ = shutdown_tx.send(()).await;
            }
            result = &mut handle => {
                return result.context("Scheduler task panicked")?;
            }
        }
    }

    info!("Daemon shutting down...");
    handle.await.context("Scheduler task panicked")??;

    info!("Daemon stopped");
    Ok(())
}
