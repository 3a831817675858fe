//! Periodic sweeper
//!
//! Runs the time-driven parts of the economy:
//! - Expiring overdue wars and declarations
//! - Expiring lapsed diplomatic requests
//! - Charging daily war upkeep

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::SweeperConfig;
use crate::diplomacy::DiplomacyWorkbench;
use crate::error::Result;
use crate::war::WarEngine;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Wars and declarations that expired
    pub expired_wars: usize,
    /// Diplomatic requests that lapsed
    pub expired_requests: usize,
    /// Wars charged upkeep
    pub upkeep_charged: usize,
}

impl SweepReport {
    /// Whether the sweep changed anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Background sweep loop
pub struct Sweeper {
    wars: Arc<WarEngine>,
    diplomacy: Arc<DiplomacyWorkbench>,
    config: SweeperConfig,
}

impl Sweeper {
    /// Create a sweeper
    pub fn new(
        wars: Arc<WarEngine>,
        diplomacy: Arc<DiplomacyWorkbench>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            wars,
            diplomacy,
            config,
        }
    }

    /// Sweep every `check_interval_secs` until `shutdown` fires
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        info!(interval_secs = self.config.check_interval_secs, "Sweeper starting");

        let check_interval = tokio::time::Duration::from_secs(self.config.check_interval_secs);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(check_interval) => {
                    if let Err(e) = self.sweep_once(Utc::now()).await {
                        error!("Sweep failed: {}", e);
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Sweeper shutting down");
                    break;
                }
            }
        }

        info!("Sweeper stopped");
        Ok(())
    }

    /// Run a single sweep as of `now`
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let expired_wars = self.wars.process_overdue_wars(now).await?;
        let expired_requests = self.diplomacy.expire_requests(now).await?;
        let upkeep_charged = if self.config.daily_upkeep_enabled {
            self.wars.apply_daily_upkeep(now).await?
        } else {
            0
        };

        let report = SweepReport {
            expired_wars,
            expired_requests,
            upkeep_charged,
        };
        if report.is_empty() {
            debug!("Sweep found nothing to do");
        } else {
            info!(
                expired_wars,
                expired_requests, upkeep_charged, "Sweep completed"
            );
        }
        Ok(report)
    }
}
