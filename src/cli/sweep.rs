//! `guildhall sweep`

use anyhow::Result;
use chrono::Utc;
use guildhall_core::Sweeper;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::runtime::Runtime;

pub async fn run(runtime: Runtime, once: bool) -> Result<()> {
    let sweeper = Sweeper::new(
        runtime.hall.wars.clone(),
        runtime.hall.diplomacy.clone(),
        runtime.config.sweeper.clone(),
    );

    if once {
        let report = sweeper.sweep_once(Utc::now()).await?;
        println!("🧹 Sweep finished");
        println!("   Wars ended:        {}", report.expired_wars);
        println!("   Requests expired:  {}", report.expired_requests);
        println!("   Upkeep charges:    {}", report.upkeep_charged);
        runtime.store.close().await;
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
            }
            shutdown.cancel();
        });
    }

    sweeper.run(shutdown).await?;
    runtime.store.close().await;
    Ok(())
}
