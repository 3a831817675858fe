//! Ranks - per-guild authority ladder
//!
//! Every guild owns an ordered set of ranks. Priority is an integer where
//! **lower values denote higher authority**; the rank with the lowest value
//! is the owner rank. Priorities are sparse, so "next rank up" means the
//! rank with the largest priority strictly below the current one.

mod authority;
mod permission;

pub use authority::RankAuthority;
pub use permission::{PermissionCategory, RankPermission, CATEGORY_TABLE};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Maximum rank name length in characters
pub const MAX_RANK_NAME_LEN: usize = 24;

/// A named rank inside one guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    /// Unique rank ID
    pub id: Uuid,
    /// Owning guild
    pub guild_id: Uuid,
    /// Display name, unique within the guild
    pub name: String,
    /// Lower is more authoritative
    pub priority: i32,
    /// Granted permissions
    pub permissions: BTreeSet<RankPermission>,
    /// Optional display icon
    pub icon: Option<String>,
}

impl Rank {
    /// Create a rank without permissions
    pub fn new(guild_id: Uuid, name: impl Into<String>, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id,
            name: name.into(),
            priority,
            permissions: BTreeSet::new(),
            icon: None,
        }
    }

    /// Replace the permission set
    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = RankPermission>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self
    }

    /// Set the display icon
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Whether this rank grants `permission`
    #[must_use]
    pub fn has(&self, permission: RankPermission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Whether `name` is acceptable as a rank name
    #[must_use]
    pub fn is_valid_name(name: &str) -> bool {
        let trimmed = name.trim();
        !trimmed.is_empty() && trimmed.chars().count() <= MAX_RANK_NAME_LEN
    }
}

/// The ladder every new guild starts with
pub fn default_ranks(guild_id: Uuid) -> Vec<Rank> {
    use RankPermission::*;

    vec![
        Rank::new(guild_id, "Owner", 0).with_permissions(RankPermission::all()),
        Rank::new(guild_id, "Co-Owner", 1).with_permissions([
            ManageRanks,
            ManageMembers,
            ManageBanner,
            ManageHome,
            ManageMode,
            ManageRelations,
            DeclareWar,
            DepositToBank,
            WithdrawFromBank,
            ViewBankTransactions,
            SendAnnouncements,
            SendPings,
            ManageClaims,
            ManageFlags,
            ManagePermissions,
        ]),
        Rank::new(guild_id, "Admin", 2).with_permissions([
            ManageMembers,
            ManageBanner,
            ManageHome,
            ManageRelations,
            DeclareWar,
            DepositToBank,
            ViewBankTransactions,
            SendAnnouncements,
            SendPings,
            ManageClaims,
            ManageFlags,
        ]),
        Rank::new(guild_id, "Mod", 3).with_permissions([
            ManageMembers,
            DepositToBank,
            ViewBankTransactions,
            SendAnnouncements,
            ManageClaims,
        ]),
        Rank::new(guild_id, "Member", 4).with_permissions([ViewBankTransactions]),
    ]
}

#[cfg(test)]
mod tests;
