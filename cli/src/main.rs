//! fileagent: the command-line entry point for the file update agent.
//!
//! # Usage
//!
//! ```text
//! fileagent serve
//! fileagent --dir /srv/files run --desired desired.json
//! fileagent inventory
//! ```
//!
//! Logs go to stderr; stdout carries JSON-lines feedback (`serve`, `run`)
//! or the pretty-printed inventory graph (`inventory`).

mod commands;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fileagent_core::data::settings;
use fileagent_core::types::config::AgentSettings;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "FILEAGENT_CONFIG";

/// fileagent - reconcile a directory of files against a desired state
#[derive(Parser, Debug)]
#[command(name = "fileagent")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a YAML settings file (also read from FILEAGENT_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Managed directory, overriding the settings file
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Scope this agent answers for, overriding the settings file
    #[arg(long)]
    domain: Option<String>,

    /// Parent directory for temporary workspaces
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error, or a full directive)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Speak the JSON-lines control protocol on stdin/stdout
    Serve,

    /// Drive one complete reconciliation toward a desired-state file
    Run {
        /// Desired-state JSON document
        #[arg(long)]
        desired: PathBuf,

        /// Activity identifier used in feedback
        #[arg(long, default_value = "local")]
        activity: String,
    },

    /// Print the current inventory graph
    Inventory,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let config_path = resolve_config_path(cli.config.as_deref());
    let settings = resolve_settings(&cli, config_path.as_deref())?;

    match cli.command {
        Commands::Serve => commands::serve(settings),
        Commands::Run { desired, activity } => {
            if !commands::run(settings, &desired, &activity)? {
                process::exit(1);
            }
            Ok(())
        }
        Commands::Inventory => commands::inventory(settings),
    }
}

/// The settings file to read: the flag, else the environment, else none.
fn resolve_config_path(flag: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(path.to_path_buf());
    }
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Load settings from `config_path` (defaults when `None`) and apply the
/// command-line overrides.
fn resolve_settings(cli: &Cli, config_path: Option<&Path>) -> Result<AgentSettings> {
    let mut resolved = match config_path {
        Some(path) => settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => settings::default_settings(),
    };
    if let Some(dir) = &cli.dir {
        resolved.managed_dir = dir.clone();
    }
    if let Some(domain) = &cli.domain {
        resolved.domain = domain.clone();
    }
    if let Some(work_dir) = &cli.work_dir {
        resolved.work_dir = Some(work_dir.clone());
    }
    Ok(resolved)
}
