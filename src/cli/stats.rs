//! `guildhall stats <name>`

use anyhow::{bail, Result};
use guildhall_core::WarStatus;

use crate::runtime::Runtime;

pub async fn run(runtime: Runtime, name: &str, top: usize) -> Result<()> {
    let hall = &runtime.hall;
    let Some(guild) = hall.guilds.find_guild_by_name(name).await? else {
        runtime.store.close().await;
        bail!("No guild named '{}'", name);
    };

    println!("🏰 {} ({})", guild.name, guild.mode);
    if guild.emergency_freeze {
        println!("   🧊 Bank is frozen");
    }

    let stats = hall.bank.get_bank_stats(guild.id).await?;
    println!("\n💰 Bank");
    println!("   Balance:       {}", stats.current_balance);
    println!("   Transactions:  {}", stats.total_transactions);
    println!("   Deposits:      {}", stats.total_deposits);
    println!("   Withdrawals:   {}", stats.total_withdrawals);
    println!("   Fees:          {}", stats.total_fees);
    println!("   Deductions:    {}", stats.total_deductions);

    let contributors = hall.bank.get_top_contributors(guild.id, top).await?;
    if !contributors.is_empty() {
        println!("\n🏅 Top contributors");
        for (i, c) in contributors.iter().enumerate() {
            println!(
                "   {}. {}  +{} / -{}  ({} transactions)",
                i + 1,
                c.player_id,
                c.total_deposits,
                c.total_withdrawals,
                c.transaction_count
            );
        }
    }

    let wars = hall.wars.get_wars_for_guild(guild.id).await?;
    let history = hall.wars.get_war_history(guild.id, None).await?;
    let wins = history.iter().filter(|w| w.winner == Some(guild.id)).count();
    let losses = history
        .iter()
        .filter(|w| w.status == WarStatus::Resolved && w.winner.is_some_and(|id| id != guild.id))
        .count();
    let ratio = hall.wars.get_win_loss_ratio(guild.id).await?;

    println!("\n⚔️ Wars");
    println!("   Open:     {}", wars.iter().filter(|w| w.status.is_open()).count());
    println!("   Record:   {} won, {} lost", wins, losses);
    if ratio == f64::MAX {
        println!("   Ratio:    unbeaten");
    } else {
        println!("   Ratio:    {:.2}", ratio);
    }

    runtime.store.close().await;
    Ok(())
}
