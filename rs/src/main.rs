use std::collections::HashMap;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use repostore::Catalog;
use repostore::cli::{Cli, Command};
use repostore::config::Config;

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("repostore starting");

    let catalog = Catalog::open(&config.db_path)
        .context(format!("Failed to open catalog at {}", config.db_path.display()))?;

    match cli.command {
        Command::Add { name, interval } => {
            let record = catalog.add_repo(&name, interval)?;
            println!("{} Added repository: {}", "✓".green(), record.name.cyan());
        }
        Command::List => {
            let repos = catalog.list_repos()?;
            if repos.is_empty() {
                println!("No repositories in catalog");
            } else {
                for repo in repos {
                    let tracked = if repo.tracked {
                        "tracked".green()
                    } else {
                        "untracked".dimmed()
                    };
                    let interval = repo
                        .pull_interval_secs
                        .map(|s| format!("{}s", s))
                        .unwrap_or_else(|| "default".to_string());
                    println!("{:<30} {:<10} every {}", repo.name.cyan(), tracked, interval);
                }
            }
        }
        Command::Track { name } => {
            catalog.set_tracked(&name, true)?;
            println!("{} Tracking: {}", "✓".green(), name);
        }
        Command::Untrack { name } => {
            catalog.set_tracked(&name, false)?;
            println!("{} Untracked: {}", "✓".green(), name);
        }
        Command::Interval { name, secs } => {
            catalog.set_interval(&name, secs)?;
            match secs {
                Some(s) => println!("{} Interval for {}: {}s", "✓".green(), name, s),
                None => println!("{} Interval for {}: global default", "✓".green(), name),
            }
        }
        Command::Remove { name } => {
            catalog.remove_repo(&name)?;
            println!("{} Removed repository: {}", "✓".green(), name);
        }
        Command::Signal { name } => {
            catalog.raise_signal(&name)?;
            println!("{} Urgent signal raised for: {}", "✓".green(), name.cyan());
        }
        Command::Signals => {
            let pending = catalog.pending_signals()?;
            if pending.is_empty() {
                println!("No pending signals");
            } else {
                let names: HashMap<String, String> = catalog
                    .list_repos()?
                    .into_iter()
                    .map(|r| (r.id, r.name))
                    .collect();
                for signal in pending {
                    let name = names
                        .get(&signal.repo_id)
                        .map(String::as_str)
                        .unwrap_or(signal.repo_id.as_str());
                    println!("{:<30} raised {}", name.cyan(), signal.raised_at.to_rfc3339().dimmed());
                }
            }
        }
        Command::Clear { name } => {
            let repos = catalog.resolve(Some(std::slice::from_ref(&name)))?;
            let removed = catalog.clear_signals(&repos[0].id)?;
            println!("{} Cleared {} signal(s) for: {}", "✓".green(), removed, name);
        }
    }

    Ok(())
}
