//! Guildhall Core - Guild Economy Engine
//!
//! This crate provides the guild economy and conflict domain,
//! including:
//! - Ranks: Per-guild rank ladder and permission checks
//! - Bank: Append-only ledger, fees, escrow holds and emergency freeze
//! - War: Declaration lifecycle, wagers, objectives and resolution
//! - Diplomacy: Alliance and truce requests with expiry
//! - Guilds: Formation, membership, mode switching and disbandment
//! - Sweeper: Periodic expiry and upkeep loop
//! - Store: Repository traits and an in-memory backend

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bank;
pub mod config;
pub mod diplomacy;
pub mod error;
pub mod guild;
pub mod hall;
pub mod locks;
pub mod ranks;
pub mod store;
pub mod sweeper;
pub mod war;

#[cfg(test)]
mod testing;

pub use bank::{
    AuditAction, BankAudit, BankLedger, BankStats, BankTransaction, ContributionStatus,
    EscrowHold, EscrowStatus, MemberContribution, TransactionType, SYSTEM_ACTOR,
};
pub use config::{BankConfig, DiplomacyConfig, EconomyConfig, GuildConfig, SweeperConfig, WarConfig};
pub use diplomacy::{DiplomacyWorkbench, DiplomaticRelation, DiplomaticRequest, RelationType};
pub use error::{Error, Result, UserFriendlyError};
pub use guild::{Guild, GuildMode, GuildRegistry, Member};
pub use hall::GuildHall;
pub use locks::GuildLocks;
pub use ranks::{PermissionCategory, Rank, RankAuthority, RankPermission};
pub use store::{
    DiplomacyStore, GuildStore, LedgerStore, MemberStore, MemoryStore, RankStore, WarStore,
};
pub use sweeper::{SweepReport, Sweeper};
pub use war::{
    ObjectiveType, PeaceProposal, PeaceStatus, War, WarEngine, WarObjective, WarStats, WarStatus,
};
