//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod config_cmd;
mod discover;
mod scrape;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use careerscout::config::DiscoveryPolicy;

use super::helpers::load_config;

#[derive(Parser)]
#[command(name = "careerscout")]
#[command(about = "Find company career pages and extract their job listings")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

/// Options shared by batch commands.
#[derive(clap::Args, Clone, Debug)]
pub struct BatchArgs {
    /// Companies processed in parallel (overrides config)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Write JSON output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

/// Candidate selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PolicyArg {
    /// First passing candidate
    First,
    /// Best scoring candidate across all queries
    Best,
}

impl From<PolicyArg> for DiscoveryPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::First => DiscoveryPolicy::First,
            PolicyArg::Best => DiscoveryPolicy::Best,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Find career page URLs for every company in a roster
    Discover {
        /// Roster file (.json, or name,url lines)
        roster: PathBuf,

        /// Candidate selection policy (overrides config)
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Extract listings from discovered (or known) career pages
    Scrape {
        /// Discovery output from `discover`, or a roster with known URLs
        input: PathBuf,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Discover and scrape in one batch
    Run {
        /// Roster file (.json, or name,url lines)
        roster: PathBuf,

        /// Also write discovery results here
        #[arg(long)]
        discovery_output: Option<PathBuf>,

        /// Candidate selection policy (overrides config)
        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,

    /// Compile every site profile and report problems
    Check,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Discover {
            roster,
            policy,
            batch,
        } => {
            if let Some(policy) = policy {
                config.discovery.policy = policy.into();
            }
            discover::cmd_discover(config, &roster, &batch).await
        }
        Commands::Scrape { input, batch } => scrape::cmd_scrape(config, &input, &batch).await,
        Commands::Run {
            roster,
            discovery_output,
            policy,
            batch,
        } => {
            if let Some(policy) = policy {
                config.discovery.policy = policy.into();
            }
            scrape::cmd_run(config, &roster, discovery_output.as_ref(), &batch).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&config),
            ConfigCommands::Check => config_cmd::cmd_config_check(&config),
        },
    }
}

impl BatchArgs {
    /// Apply CLI overrides to the loaded configuration.
    fn apply(&self, config: &mut careerscout::Config) {
        if let Some(workers) = self.workers {
            config.concurrency.workers = workers.max(1);
        }
    }
}
