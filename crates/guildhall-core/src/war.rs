//! War - declaration lifecycle between two guilds
//!
//! # Lifecycle
//!
//! ```text
//! declare ──(defender HOSTILE, no wager)──────────────▶ ACTIVE
//!    │
//!    └──(defender PEACEFUL or wager > 0)──▶ PENDING_ACCEPTANCE
//!                                             │  accept (matching wager) ──▶ ACTIVE
//!                                             │  reject / cancel ─────────▶ CANCELLED
//!                                             └  deadline passes ─────────▶ EXPIRED
//!
//! ACTIVE ──(objective reached / surrender)──▶ RESOLVED(winner)  escrow captured
//! ACTIVE ──(duration elapsed)───────────────▶ RESOLVED(draw)    escrow released
//! ACTIVE ──(peace proposal accepted)────────▶ RESOLVED(draw)    escrow released
//! ```
//!
//! Terminal wars never change again; repeated resolution attempts are no-ops.

mod engine;
mod peace;

pub use engine::WarEngine;
pub use peace::{PeaceProposal, PeaceStatus, MAX_PEACE_TERMS_LEN};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// War state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarStatus {
    /// Waiting for the defender to accept
    PendingAcceptance,
    /// Fighting
    Active,
    /// Ended with a winner or as a draw
    Resolved,
    /// Rejected by the defender or withdrawn by the declarer
    Cancelled,
    /// Never accepted before the deadline
    Expired,
}

impl WarStatus {
    /// Stable storage name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WarStatus::PendingAcceptance => "PENDING_ACCEPTANCE",
            WarStatus::Active => "ACTIVE",
            WarStatus::Resolved => "RESOLVED",
            WarStatus::Cancelled => "CANCELLED",
            WarStatus::Expired => "EXPIRED",
        }
    }

    /// Pending or active
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, WarStatus::PendingAcceptance | WarStatus::Active)
    }

    /// Resolved, cancelled or expired
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }
}

impl fmt::Display for WarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WarStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_ACCEPTANCE" => Ok(WarStatus::PendingAcceptance),
            "ACTIVE" => Ok(WarStatus::Active),
            "RESOLVED" => Ok(WarStatus::Resolved),
            "CANCELLED" => Ok(WarStatus::Cancelled),
            "EXPIRED" => Ok(WarStatus::Expired),
            other => Err(format!("unknown war status: {}", other)),
        }
    }
}

/// Measurable goal of a war
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectiveType {
    /// Kills of enemy-guild members
    Kills,
}

/// A target that ends the war when one side reaches it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarObjective {
    /// Objective kind
    #[serde(rename = "type")]
    pub kind: ObjectiveType,
    /// Count needed to win
    pub target_value: u32,
    /// Human-readable summary
    pub description: String,
}

impl WarObjective {
    /// Kill-count objective
    pub fn kills(target_value: u32) -> Self {
        Self {
            kind: ObjectiveType::Kills,
            target_value,
            description: format!("First to {} kills", target_value),
        }
    }
}

/// Per-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarStats {
    /// Kills scored by the declaring guild
    pub declaring_kills: u32,
    /// Kills scored by the defending guild
    pub defending_kills: u32,
}

/// A war between two guilds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct War {
    /// Unique war ID
    pub id: Uuid,
    /// Guild that declared
    pub declaring_guild_id: Uuid,
    /// Guild declared upon
    pub defending_guild_id: Uuid,
    /// Fighting time once active, in seconds
    pub duration_secs: i64,
    /// Win conditions
    pub objectives: Vec<WarObjective>,
    /// Amount each side stakes; zero for no wager
    pub wager: i64,
    /// Declaring side's escrow hold
    pub declaring_hold_id: Option<Uuid>,
    /// Defending side's escrow hold
    pub defending_hold_id: Option<Uuid>,
    /// Current state
    pub status: WarStatus,
    /// Declaration time
    pub declared_at: DateTime<Utc>,
    /// Acceptance deadline while pending
    pub acceptance_deadline: Option<DateTime<Utc>>,
    /// Time fighting began
    pub started_at: Option<DateTime<Utc>>,
    /// Time fighting ends without a winner
    pub expires_at: Option<DateTime<Utc>>,
    /// Time the war reached a terminal state
    pub ended_at: Option<DateTime<Utc>>,
    /// Winning guild; `None` for a draw or while unresolved
    pub winner: Option<Uuid>,
    /// Kill counters
    pub stats: WarStats,
    /// Last daily upkeep charge
    pub last_upkeep_at: Option<DateTime<Utc>>,
    /// Why the war ended
    pub end_reason: Option<String>,
}

impl War {
    /// A fresh declaration awaiting acceptance
    pub fn declare(
        declaring_guild_id: Uuid,
        defending_guild_id: Uuid,
        duration: Duration,
        objectives: Vec<WarObjective>,
        wager: i64,
        acceptance_deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            declaring_guild_id,
            defending_guild_id,
            duration_secs: duration.num_seconds(),
            objectives,
            wager,
            declaring_hold_id: None,
            defending_hold_id: None,
            status: WarStatus::PendingAcceptance,
            declared_at: Utc::now(),
            acceptance_deadline: Some(acceptance_deadline),
            started_at: None,
            expires_at: None,
            ended_at: None,
            winner: None,
            stats: WarStats::default(),
            last_upkeep_at: None,
            end_reason: None,
        }
    }

    /// Fighting duration; `None` if the stored value is out of range
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        Duration::try_seconds(self.duration_secs)
    }

    /// Whether the war is being fought
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == WarStatus::Active
    }

    /// Whether `guild_id` is one of the two sides
    #[must_use]
    pub fn involves(&self, guild_id: Uuid) -> bool {
        self.declaring_guild_id == guild_id || self.defending_guild_id == guild_id
    }

    /// The other side
    #[must_use]
    pub fn opponent_of(&self, guild_id: Uuid) -> Option<Uuid> {
        if guild_id == self.declaring_guild_id {
            Some(self.defending_guild_id)
        } else if guild_id == self.defending_guild_id {
            Some(self.declaring_guild_id)
        } else {
            None
        }
    }

    /// The losing side of a decided war
    #[must_use]
    pub fn loser(&self) -> Option<Uuid> {
        self.winner.and_then(|w| self.opponent_of(w))
    }

    /// Kills scored by one side
    #[must_use]
    pub fn kills_of(&self, guild_id: Uuid) -> u32 {
        if guild_id == self.declaring_guild_id {
            self.stats.declaring_kills
        } else if guild_id == self.defending_guild_id {
            self.stats.defending_kills
        } else {
            0
        }
    }

    /// Side that has met a kill objective, if any
    #[must_use]
    pub fn objective_winner(&self) -> Option<Uuid> {
        self.objectives
            .iter()
            .filter(|o| o.kind == ObjectiveType::Kills)
            .find_map(|o| {
                if self.stats.declaring_kills >= o.target_value {
                    Some(self.declaring_guild_id)
                } else if self.stats.defending_kills >= o.target_value {
                    Some(self.defending_guild_id)
                } else {
                    None
                }
            })
    }

    /// Escrow holds attached to this war
    pub fn holds(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.declaring_hold_id
            .iter()
            .chain(self.defending_hold_id.iter())
            .copied()
    }

    fn start(&mut self, now: DateTime<Utc>) -> crate::Result<()> {
        let expires_at = self
            .duration()
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| {
                Error::Invariant(format!(
                    "war {} duration of {}s runs past the supported calendar",
                    self.id, self.duration_secs
                ))
            })?;
        self.status = WarStatus::Active;
        self.acceptance_deadline = None;
        self.started_at = Some(now);
        self.expires_at = Some(expires_at);
        Ok(())
    }

    fn finish(
        &mut self,
        status: WarStatus,
        winner: Option<Uuid>,
        reason: &str,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        self.winner = winner;
        self.ended_at = Some(now);
        self.end_reason = Some(reason.to_string());
    }
}

#[cfg(test)]
mod tests;
