//! Guildhall - Guild Economy Maintenance
//!
//! CLI entry point for operating a guild economy database.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guildhall=info,guildhall_core=info,guildhall_store=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = cli::Cli::parse();
    debug!("Guildhall v{}", env!("CARGO_PKG_VERSION"));

    cli::run(cli).await
}
