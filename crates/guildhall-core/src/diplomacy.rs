//! Diplomacy - alliance and truce requests
//!
//! A guild sends a request to another guild; the target accepts (creating a
//! relation) or rejects it, the sender may cancel it, and unanswered
//! requests lapse after a configured period.

mod workbench;

pub use workbench::DiplomacyWorkbench;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Kind of non-war relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// Mutual alliance
    Alliance,
    /// Cessation of hostilities
    Truce,
}

impl RelationType {
    /// Stable storage name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::Alliance => "ALLIANCE",
            RelationType::Truce => "TRUCE",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALLIANCE" => Ok(RelationType::Alliance),
            "TRUCE" => Ok(RelationType::Truce),
            other => Err(format!("unknown relation type: {}", other)),
        }
    }
}

/// Outstanding request from one guild to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiplomaticRequest {
    /// Unique request ID
    pub id: Uuid,
    /// Requested relation
    #[serde(rename = "type")]
    pub kind: RelationType,
    /// Sending guild
    pub from_guild_id: Uuid,
    /// Receiving guild
    pub to_guild_id: Uuid,
    /// Player who sent it
    pub actor_id: Uuid,
    /// Optional note
    pub message: Option<String>,
    /// Send time
    pub created_at: DateTime<Utc>,
    /// Lapse time
    pub expires_at: DateTime<Utc>,
}

impl DiplomaticRequest {
    /// Whether the request has lapsed at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Established relation between two guilds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiplomaticRelation {
    /// Unique relation ID
    pub id: Uuid,
    /// Relation kind
    #[serde(rename = "type")]
    pub kind: RelationType,
    /// Guild that sent the original request
    pub guild_a: Uuid,
    /// Guild that accepted it
    pub guild_b: Uuid,
    /// Acceptance time
    pub established_at: DateTime<Utc>,
}

impl DiplomaticRelation {
    /// Whether `guild_id` is a party
    #[must_use]
    pub fn involves(&self, guild_id: Uuid) -> bool {
        self.guild_a == guild_id || self.guild_b == guild_id
    }
}

#[cfg(test)]
mod tests;
