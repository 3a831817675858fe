//! `guildhall verify`
//!
//! Recomputes each guild balance from its ledger. Any divergence makes the
//! command fail so it can gate scripts and cron jobs.

use anyhow::{bail, Result};
use guildhall_core::error::format_error_for_cli;

use crate::runtime::Runtime;

pub async fn run(runtime: Runtime) -> Result<()> {
    println!("🔎 Verifying guild banks\n");

    let guilds = runtime.hall.guilds.list_guilds().await?;
    let mut failures = 0usize;

    for guild in &guilds {
        match runtime.hall.bank.verify_balance(guild.id).await {
            Ok(balance) => {
                let holds = runtime.hall.bank.get_open_holds(guild.id).await?;
                let held: i64 = holds.iter().map(|h| h.amount).sum();
                if holds.is_empty() {
                    println!("✅ {}: {}", guild.name, balance);
                } else {
                    println!(
                        "✅ {}: {} ({} in {} open escrow holds)",
                        guild.name,
                        balance,
                        held,
                        holds.len()
                    );
                }
            }
            Err(e) => {
                failures += 1;
                println!("❌ {}\n{}", guild.name, format_error_for_cli(&e));
            }
        }
    }

    println!();
    runtime.store.close().await;
    if failures > 0 {
        bail!("{} of {} guild banks failed verification", failures, guilds.len());
    }
    println!("All {} guild banks match their ledgers.", guilds.len());
    Ok(())
}
