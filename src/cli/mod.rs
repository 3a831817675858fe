//! CLI module for Guildhall
//!
//! Operator commands against the configured database:
//! - `sweep`: Expire overdue wars and requests, charge war upkeep
//! - `verify`: Check every guild bank against its ledger
//! - `stats`: Bank and war summary for one guild
//! - `config`: Print or write the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::runtime::{load_config, Runtime};

pub mod stats;
pub mod sweep;
pub mod verify;

/// Guild economy operator CLI
#[derive(Parser, Debug)]
#[command(name = "guildhall")]
#[command(about = "Guild bank, war and diplomacy maintenance")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the expiry and upkeep sweeper
    Sweep {
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,
    },
    /// Verify every guild balance against its ledger
    Verify,
    /// Show bank and war statistics for a guild
    Stats {
        /// Guild name (case-insensitive)
        name: String,
        /// Number of top contributors to list
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Write to this file instead of stdout
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Sweep { once }) => sweep::run(Runtime::start().await?, once).await,
        Some(Commands::Verify) => verify::run(Runtime::start().await?).await,
        Some(Commands::Stats { name, top }) => {
            stats::run(Runtime::start().await?, &name, top).await
        }
        Some(Commands::Config { write }) => {
            let config = load_config()?;
            match write {
                Some(path) => {
                    config.save(&path)?;
                    println!("✅ Configuration written to {}", path.display());
                }
                None => print!("{}", toml::to_string_pretty(&config)?),
            }
            Ok(())
        }
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
