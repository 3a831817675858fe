//! Rank permissions
//!
//! A closed set of permissions, grouped into categories by a static table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single grantable permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum RankPermission {
    // Guild management
    ManageRanks,
    ManageMembers,
    ManageBanner,
    ManageEmoji,
    ManageDescription,
    ManageGuildName,
    ManageHome,
    ManageMode,
    ManageGuildSettings,

    // Relations and diplomacy
    ManageRelations,
    DeclareWar,
    AcceptAlliances,
    ManageParties,
    SendPartyRequests,
    AcceptPartyInvites,

    // Banking and economy
    DepositMoney,
    WithdrawMoney,
    DepositToBank,
    WithdrawFromBank,
    ViewBankTransactions,
    ViewBankHistory,
    ExportBankData,
    ManageBankSettings,

    // Bank security
    ManageBankSecurity,
    ActivateEmergencyFreeze,
    DeactivateEmergencyFreeze,
    ViewSecurityAudits,
    ManageBudgets,

    // Communication
    UseChat,
    SendAnnouncements,
    SendPings,
    ModerateChat,
    ManageChatSettings,

    // Claims and territory
    ClaimLand,
    UnclaimLand,
    ManageClaims,
    ManageFlags,
    ManagePermissions,
    CreateClaims,
    DeleteClaims,

    // Special roles
    AccessAdminCommands,
    BypassRestrictions,
    ViewAuditLogs,
    ManageIntegrations,
    OverrideProtection,
    BypassCooldowns,
    ManageSecurity,
}

/// Permission grouping used by rank editors and audits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    /// Guild identity, ranks and members
    GuildManagement,
    /// Wars, alliances and parties
    Relations,
    /// Deposits, withdrawals and bank reports
    Banking,
    /// Freeze controls and security audits
    BankSecurity,
    /// Chat and announcements
    Communication,
    /// Land claims
    Claims,
    /// Administrative overrides
    Special,
}

use RankPermission::*;

/// Static permission-to-category mapping
pub const CATEGORY_TABLE: &[(PermissionCategory, &[RankPermission])] = &[
    (
        PermissionCategory::GuildManagement,
        &[
            ManageRanks,
            ManageMembers,
            ManageBanner,
            ManageEmoji,
            ManageDescription,
            ManageGuildName,
            ManageHome,
            ManageMode,
            ManageGuildSettings,
        ],
    ),
    (
        PermissionCategory::Relations,
        &[
            ManageRelations,
            DeclareWar,
            AcceptAlliances,
            ManageParties,
            SendPartyRequests,
            AcceptPartyInvites,
        ],
    ),
    (
        PermissionCategory::Banking,
        &[
            DepositMoney,
            WithdrawMoney,
            DepositToBank,
            WithdrawFromBank,
            ViewBankTransactions,
            ViewBankHistory,
            ExportBankData,
            ManageBankSettings,
        ],
    ),
    (
        PermissionCategory::BankSecurity,
        &[
            ManageBankSecurity,
            ActivateEmergencyFreeze,
            DeactivateEmergencyFreeze,
            ViewSecurityAudits,
            ManageBudgets,
        ],
    ),
    (
        PermissionCategory::Communication,
        &[
            UseChat,
            SendAnnouncements,
            SendPings,
            ModerateChat,
            ManageChatSettings,
        ],
    ),
    (
        PermissionCategory::Claims,
        &[
            ClaimLand,
            UnclaimLand,
            ManageClaims,
            ManageFlags,
            ManagePermissions,
            CreateClaims,
            DeleteClaims,
        ],
    ),
    (
        PermissionCategory::Special,
        &[
            AccessAdminCommands,
            BypassRestrictions,
            ViewAuditLogs,
            ManageIntegrations,
            OverrideProtection,
            BypassCooldowns,
            ManageSecurity,
        ],
    ),
];

impl RankPermission {
    /// Every permission, in declaration order
    pub fn all() -> impl Iterator<Item = RankPermission> {
        CATEGORY_TABLE
            .iter()
            .flat_map(|(_, perms)| perms.iter().copied())
    }

    /// Category this permission belongs to
    #[must_use]
    pub fn category(self) -> PermissionCategory {
        CATEGORY_TABLE
            .iter()
            .find(|(_, perms)| perms.contains(&self))
            .map(|(category, _)| *category)
            .unwrap_or(PermissionCategory::Special)
    }

    /// Stable storage name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ManageRanks => "MANAGE_RANKS",
            ManageMembers => "MANAGE_MEMBERS",
            ManageBanner => "MANAGE_BANNER",
            ManageEmoji => "MANAGE_EMOJI",
            ManageDescription => "MANAGE_DESCRIPTION",
            ManageGuildName => "MANAGE_GUILD_NAME",
            ManageHome => "MANAGE_HOME",
            ManageMode => "MANAGE_MODE",
            ManageGuildSettings => "MANAGE_GUILD_SETTINGS",
            ManageRelations => "MANAGE_RELATIONS",
            DeclareWar => "DECLARE_WAR",
            AcceptAlliances => "ACCEPT_ALLIANCES",
            ManageParties => "MANAGE_PARTIES",
            SendPartyRequests => "SEND_PARTY_REQUESTS",
            AcceptPartyInvites => "ACCEPT_PARTY_INVITES",
            DepositMoney => "DEPOSIT_MONEY",
            WithdrawMoney => "WITHDRAW_MONEY",
            DepositToBank => "DEPOSIT_TO_BANK",
            WithdrawFromBank => "WITHDRAW_FROM_BANK",
            ViewBankTransactions => "VIEW_BANK_TRANSACTIONS",
            ViewBankHistory => "VIEW_BANK_HISTORY",
            ExportBankData => "EXPORT_BANK_DATA",
            ManageBankSettings => "MANAGE_BANK_SETTINGS",
            ManageBankSecurity => "MANAGE_BANK_SECURITY",
            ActivateEmergencyFreeze => "ACTIVATE_EMERGENCY_FREEZE",
            DeactivateEmergencyFreeze => "DEACTIVATE_EMERGENCY_FREEZE",
            ViewSecurityAudits => "VIEW_SECURITY_AUDITS",
            ManageBudgets => "MANAGE_BUDGETS",
            UseChat => "USE_CHAT",
            SendAnnouncements => "SEND_ANNOUNCEMENTS",
            SendPings => "SEND_PINGS",
            ModerateChat => "MODERATE_CHAT",
            ManageChatSettings => "MANAGE_CHAT_SETTINGS",
            ClaimLand => "CLAIM_LAND",
            UnclaimLand => "UNCLAIM_LAND",
            ManageClaims => "MANAGE_CLAIMS",
            ManageFlags => "MANAGE_FLAGS",
            ManagePermissions => "MANAGE_PERMISSIONS",
            CreateClaims => "CREATE_CLAIMS",
            DeleteClaims => "DELETE_CLAIMS",
            AccessAdminCommands => "ACCESS_ADMIN_COMMANDS",
            BypassRestrictions => "BYPASS_RESTRICTIONS",
            ViewAuditLogs => "VIEW_AUDIT_LOGS",
            ManageIntegrations => "MANAGE_INTEGRATIONS",
            OverrideProtection => "OVERRIDE_PROTECTION",
            BypassCooldowns => "BYPASS_COOLDOWNS",
            ManageSecurity => "MANAGE_SECURITY",
        }
    }
}

impl fmt::Display for RankPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RankPermission::all()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown permission: {}", s))
    }
}

impl PermissionCategory {
    /// Permissions in this category
    #[must_use]
    pub fn permissions(self) -> &'static [RankPermission] {
        CATEGORY_TABLE
            .iter()
            .find(|(category, _)| *category == self)
            .map(|(_, perms)| *perms)
            .unwrap_or(&[])
    }
}
