//! Peace proposals
//!
//! One side of an active war offers terms; the other side accepts (the war
//! ends as a draw with every stake refunded) or rejects. A proposal that is
//! not answered before `expires_at` lapses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Longest accepted terms text, in characters
pub const MAX_PEACE_TERMS_LEN: usize = 256;

/// Proposal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeaceStatus {
    /// Awaiting an answer
    Pending,
    /// Accepted; the war ended
    Accepted,
    /// Turned down
    Rejected,
}

impl PeaceStatus {
    /// Stable storage name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PeaceStatus::Pending => "PENDING",
            PeaceStatus::Accepted => "ACCEPTED",
            PeaceStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for PeaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeaceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PeaceStatus::Pending),
            "ACCEPTED" => Ok(PeaceStatus::Accepted),
            "REJECTED" => Ok(PeaceStatus::Rejected),
            other => Err(format!("unknown peace status: {}", other)),
        }
    }
}

/// Offer to end a war on stated terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeaceProposal {
    /// Unique proposal ID
    pub id: Uuid,
    /// War the proposal would end
    pub war_id: Uuid,
    /// Side making the offer
    pub proposing_guild_id: Uuid,
    /// Side that answers
    pub target_guild_id: Uuid,
    /// Free-form terms
    pub terms: String,
    /// Current state
    pub status: PeaceStatus,
    /// Time of the offer
    pub proposed_at: DateTime<Utc>,
    /// Lapse time
    pub expires_at: DateTime<Utc>,
    /// Time of the answer
    pub responded_at: Option<DateTime<Utc>>,
}

impl PeaceProposal {
    /// A pending proposal
    pub fn new(
        war_id: Uuid,
        proposing_guild_id: Uuid,
        target_guild_id: Uuid,
        terms: impl Into<String>,
        proposed_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            war_id,
            proposing_guild_id,
            target_guild_id,
            terms: terms.into(),
            status: PeaceStatus::Pending,
            proposed_at,
            expires_at,
            responded_at: None,
        }
    }

    /// Pending and not yet lapsed at `now`
    #[must_use]
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PeaceStatus::Pending && now < self.expires_at
    }

    pub(crate) fn answer(&mut self, status: PeaceStatus, now: DateTime<Utc>) {
        self.status = status;
        self.responded_at = Some(now);
    }
}
