//! Guilds and membership
//!
//! Entities for guilds and their members, plus the `GuildRegistry`
//! service that forms, configures and disbands guilds.

mod registry;

pub use registry::GuildRegistry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum guild name length in characters
pub const MAX_GUILD_NAME_LEN: usize = 32;

/// Whether a guild accepts wars without negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuildMode {
    /// Wars against this guild always need acceptance
    Peaceful,
    /// Unwagered wars against this guild start immediately
    Hostile,
}

impl GuildMode {
    /// Stable storage name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GuildMode::Peaceful => "peaceful",
            GuildMode::Hostile => "hostile",
        }
    }
}

impl fmt::Display for GuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "peaceful" => Ok(GuildMode::Peaceful),
            "hostile" => Ok(GuildMode::Hostile),
            other => Err(format!("unknown guild mode: {}", other)),
        }
    }
}

/// A guild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    /// Unique guild ID
    pub id: Uuid,
    /// Display name, unique across guilds
    pub name: String,
    /// Cached ledger balance; always equals the signed transaction sum
    pub bank_balance: i64,
    /// Current mode
    pub mode: GuildMode,
    /// Time of the last mode switch
    pub mode_changed_at: Option<DateTime<Utc>>,
    /// Emergency freeze blocks all bank movements
    pub emergency_freeze: bool,
    /// Formation time
    pub created_at: DateTime<Utc>,
}

impl Guild {
    /// Create a guild with an empty bank
    pub fn new(name: impl Into<String>, mode: GuildMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bank_balance: 0,
            mode,
            mode_changed_at: None,
            emergency_freeze: false,
            created_at: Utc::now(),
        }
    }

    /// Whether `name` is acceptable as a guild name
    #[must_use]
    pub fn is_valid_name(name: &str) -> bool {
        let trimmed = name.trim();
        !trimmed.is_empty() && trimmed.chars().count() <= MAX_GUILD_NAME_LEN
    }
}

/// A player's membership in a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Player ID
    pub player_id: Uuid,
    /// Guild ID
    pub guild_id: Uuid,
    /// Current rank
    pub rank_id: Uuid,
    /// Join time
    pub joined_at: DateTime<Utc>,
}

impl Member {
    /// Create a membership starting now
    pub fn new(guild_id: Uuid, player_id: Uuid, rank_id: Uuid) -> Self {
        Self {
            player_id,
            guild_id,
            rank_id,
            joined_at: Utc::now(),
        }
    }
}
