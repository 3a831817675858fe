//! Repository traits
//!
//! Services depend on these traits only. `MemoryStore` implements all of
//! them for tests and single-process use; the `guildhall-store` crate
//! provides a SQLite backend.
//!
//! Ledger writes go through `LedgerStore` so that every balance change is
//! applied together with the transaction that explains it.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::bank::{BankAudit, BankTransaction, EscrowHold, EscrowStatus};
use crate::diplomacy::{DiplomaticRelation, DiplomaticRequest, RelationType};
use crate::error::Result;
use crate::guild::{Guild, GuildMode, Member};
use crate::ranks::Rank;
use crate::war::{PeaceProposal, War};

/// Guild rows, including the cached bank balance
#[async_trait]
pub trait GuildStore: Send + Sync {
    /// Insert a new guild
    async fn insert_guild(&self, guild: &Guild) -> Result<()>;

    /// Get a guild by ID
    async fn get_guild(&self, guild_id: Uuid) -> Result<Option<Guild>>;

    /// Find a guild by case-insensitive name
    async fn find_guild_by_name(&self, name: &str) -> Result<Option<Guild>>;

    /// List all guilds
    async fn list_guilds(&self) -> Result<Vec<Guild>>;

    /// Persist a mode switch
    async fn set_mode(
        &self,
        guild_id: Uuid,
        mode: GuildMode,
        changed_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Persist the emergency freeze flag
    async fn set_emergency_freeze(&self, guild_id: Uuid, frozen: bool) -> Result<bool>;

    /// Delete a guild and everything it owns. Open wars involving it go
    /// too; finished ones remain in the other side's history.
    async fn delete_guild(&self, guild_id: Uuid) -> Result<bool>;
}

/// Guild membership
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Insert a membership
    async fn insert_member(&self, member: &Member) -> Result<()>;

    /// Membership of a player in a specific guild
    async fn get_member(&self, guild_id: Uuid, player_id: Uuid) -> Result<Option<Member>>;

    /// The guild a player belongs to, if any
    async fn find_membership(&self, player_id: Uuid) -> Result<Option<Member>>;

    /// All members of a guild
    async fn list_members(&self, guild_id: Uuid) -> Result<Vec<Member>>;

    /// Reassign a member's rank
    async fn set_member_rank(&self, guild_id: Uuid, player_id: Uuid, rank_id: Uuid)
        -> Result<bool>;

    /// Remove a membership
    async fn remove_member(&self, guild_id: Uuid, player_id: Uuid) -> Result<bool>;
}

/// Rank definitions
#[async_trait]
pub trait RankStore: Send + Sync {
    /// Insert a rank
    async fn insert_rank(&self, rank: &Rank) -> Result<()>;

    /// Get a rank by ID
    async fn get_rank(&self, rank_id: Uuid) -> Result<Option<Rank>>;

    /// Ranks of a guild ordered by ascending priority
    async fn list_ranks(&self, guild_id: Uuid) -> Result<Vec<Rank>>;

    /// Replace a rank's name, priority, permissions and icon
    async fn update_rank(&self, rank: &Rank) -> Result<bool>;

    /// Delete a rank
    async fn delete_rank(&self, rank_id: Uuid) -> Result<bool>;
}

/// Transaction log, escrow arena and bank audit trail
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append a transaction and apply its signed amount to the cached
    /// balance in one atomic step. Returns the new balance.
    async fn append_transaction(&self, tx: &BankTransaction) -> Result<i64>;

    /// Cached balance of a guild
    async fn balance(&self, guild_id: Uuid) -> Result<Option<i64>>;

    /// Transactions of a guild, newest first
    async fn list_transactions(
        &self,
        guild_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<BankTransaction>>;

    /// Record a hold together with the debit that funds it
    async fn open_escrow(&self, hold: &EscrowHold, debit: &BankTransaction) -> Result<i64>;

    /// Settle a hold if it is still held, appending `credit` in the same
    /// step. Returns `None` when the hold was already settled.
    async fn settle_escrow(
        &self,
        hold_id: Uuid,
        status: EscrowStatus,
        beneficiary_guild_id: Uuid,
        credit: &BankTransaction,
    ) -> Result<Option<i64>>;

    /// Get a hold by ID
    async fn get_hold(&self, hold_id: Uuid) -> Result<Option<EscrowHold>>;

    /// Holds of a guild that are still held
    async fn list_open_holds(&self, guild_id: Uuid) -> Result<Vec<EscrowHold>>;

    /// Append an audit entry
    async fn insert_audit(&self, entry: &BankAudit) -> Result<()>;

    /// Audit entries of a guild, newest first
    async fn list_audits(&self, guild_id: Uuid, limit: Option<usize>) -> Result<Vec<BankAudit>>;
}

/// Wars
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WarStore: Send + Sync {
    /// Insert a war
    async fn insert_war(&self, war: &War) -> Result<()>;

    /// Get a war by ID
    async fn get_war(&self, war_id: Uuid) -> Result<Option<War>>;

    /// Replace a war
    async fn update_war(&self, war: &War) -> Result<bool>;

    /// Wars involving a guild, newest declaration first
    async fn list_wars_for_guild(&self, guild_id: Uuid) -> Result<Vec<War>>;

    /// The pending or active war between two guilds, in either direction
    async fn find_open_war_between(&self, a: Uuid, b: Uuid) -> Result<Option<War>>;

    /// All pending or active wars
    async fn list_open_wars(&self) -> Result<Vec<War>>;

    /// Insert a peace proposal
    async fn insert_peace_proposal(&self, proposal: &PeaceProposal) -> Result<()>;

    /// Get a peace proposal by ID
    async fn get_peace_proposal(&self, proposal_id: Uuid) -> Result<Option<PeaceProposal>>;

    /// Replace a peace proposal
    async fn update_peace_proposal(&self, proposal: &PeaceProposal) -> Result<bool>;

    /// Proposals made in a war, oldest first
    async fn list_peace_proposals_for_war(&self, war_id: Uuid) -> Result<Vec<PeaceProposal>>;

    /// Proposals a guild has to answer, oldest first
    async fn list_peace_proposals_for_target(&self, guild_id: Uuid)
        -> Result<Vec<PeaceProposal>>;
}

/// Diplomatic requests and relations
#[async_trait]
pub trait DiplomacyStore: Send + Sync {
    /// Insert a request
    async fn insert_request(&self, request: &DiplomaticRequest) -> Result<()>;

    /// Get a request by ID
    async fn get_request(&self, request_id: Uuid) -> Result<Option<DiplomaticRequest>>;

    /// Requests sent or received by a guild
    async fn list_requests_for_guild(&self, guild_id: Uuid) -> Result<Vec<DiplomaticRequest>>;

    /// Delete a request
    async fn delete_request(&self, request_id: Uuid) -> Result<bool>;

    /// Delete requests that expired at or before `now`
    async fn delete_expired_requests(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Insert a relation
    async fn insert_relation(&self, relation: &DiplomaticRelation) -> Result<()>;

    /// Relations involving a guild
    async fn list_relations(&self, guild_id: Uuid) -> Result<Vec<DiplomaticRelation>>;

    /// Relation of a given type between two guilds, in either direction
    async fn find_relation(
        &self,
        a: Uuid,
        b: Uuid,
        kind: RelationType,
    ) -> Result<Option<DiplomaticRelation>>;
}
