//! Database row types
//!
//! IDs are stored as text and enums by their stable names; collections
//! that have no natural column shape are stored as JSON.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

use guildhall_core::{
    BankAudit, BankTransaction, DiplomaticRelation, DiplomaticRequest, EscrowHold, Guild, Member,
    PeaceProposal, Rank, RankPermission, War, WarObjective, WarStats,
};

use crate::error::StoreError;

fn parse_id(value: &str, column: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value)
        .map_err(|e| StoreError::InvalidData(format!("{}: {} ({})", column, value, e)))
}

fn parse_opt_id(value: Option<&str>, column: &str) -> Result<Option<Uuid>, StoreError> {
    value.map(|v| parse_id(v, column)).transpose()
}

fn parse_name<T: FromStr<Err = String>>(value: &str) -> Result<T, StoreError> {
    value.parse().map_err(StoreError::InvalidData)
}

fn parse_count(value: i64, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{}: {} out of range", column, value)))
}

#[derive(FromRow)]
pub(crate) struct GuildRow {
    id: String,
    name: String,
    bank_balance: i64,
    mode: String,
    mode_changed_at: Option<DateTime<Utc>>,
    emergency_freeze: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<GuildRow> for Guild {
    type Error = StoreError;

    fn try_from(row: GuildRow) -> Result<Self, Self::Error> {
        Ok(Guild {
            id: parse_id(&row.id, "guilds.id")?,
            name: row.name,
            bank_balance: row.bank_balance,
            mode: parse_name(&row.mode)?,
            mode_changed_at: row.mode_changed_at,
            emergency_freeze: row.emergency_freeze,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct MemberRow {
    player_id: String,
    guild_id: String,
    rank_id: String,
    joined_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for Member {
    type Error = StoreError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Member {
            player_id: parse_id(&row.player_id, "members.player_id")?,
            guild_id: parse_id(&row.guild_id, "members.guild_id")?,
            rank_id: parse_id(&row.rank_id, "members.rank_id")?,
            joined_at: row.joined_at,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct RankRow {
    id: String,
    guild_id: String,
    name: String,
    priority: i32,
    permissions_json: String,
    icon: Option<String>,
}

impl TryFrom<RankRow> for Rank {
    type Error = StoreError;

    fn try_from(row: RankRow) -> Result<Self, Self::Error> {
        let permissions: BTreeSet<RankPermission> = serde_json::from_str(&row.permissions_json)?;
        Ok(Rank {
            id: parse_id(&row.id, "ranks.id")?,
            guild_id: parse_id(&row.guild_id, "ranks.guild_id")?,
            name: row.name,
            priority: row.priority,
            permissions,
            icon: row.icon,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct TransactionRow {
    id: String,
    guild_id: String,
    actor_id: String,
    kind: String,
    amount: i64,
    fee: Option<i64>,
    description: Option<String>,
    timestamp: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for BankTransaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(BankTransaction {
            id: parse_id(&row.id, "bank_transactions.id")?,
            guild_id: parse_id(&row.guild_id, "bank_transactions.guild_id")?,
            actor_id: parse_id(&row.actor_id, "bank_transactions.actor_id")?,
            kind: parse_name(&row.kind)?,
            amount: row.amount,
            fee: row.fee,
            description: row.description,
            timestamp: row.timestamp,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct HoldRow {
    id: String,
    guild_id: String,
    actor_id: String,
    amount: i64,
    purpose: String,
    status: String,
    beneficiary_guild_id: Option<String>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<HoldRow> for EscrowHold {
    type Error = StoreError;

    fn try_from(row: HoldRow) -> Result<Self, Self::Error> {
        Ok(EscrowHold {
            id: parse_id(&row.id, "escrow_holds.id")?,
            guild_id: parse_id(&row.guild_id, "escrow_holds.guild_id")?,
            actor_id: parse_id(&row.actor_id, "escrow_holds.actor_id")?,
            amount: row.amount,
            purpose: row.purpose,
            status: parse_name(&row.status)?,
            beneficiary_guild_id: parse_opt_id(
                row.beneficiary_guild_id.as_deref(),
                "escrow_holds.beneficiary_guild_id",
            )?,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct AuditRow {
    id: String,
    guild_id: String,
    actor_id: String,
    action: String,
    amount: Option<i64>,
    description: Option<String>,
    timestamp: DateTime<Utc>,
}

impl TryFrom<AuditRow> for BankAudit {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(BankAudit {
            id: parse_id(&row.id, "bank_audits.id")?,
            guild_id: parse_id(&row.guild_id, "bank_audits.guild_id")?,
            actor_id: parse_id(&row.actor_id, "bank_audits.actor_id")?,
            action: parse_name(&row.action)?,
            amount: row.amount,
            description: row.description,
            timestamp: row.timestamp,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct WarRow {
    id: String,
    declaring_guild_id: String,
    defending_guild_id: String,
    duration_secs: i64,
    objectives_json: String,
    wager: i64,
    declaring_hold_id: Option<String>,
    defending_hold_id: Option<String>,
    status: String,
    declared_at: DateTime<Utc>,
    acceptance_deadline: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    winner: Option<String>,
    declaring_kills: i64,
    defending_kills: i64,
    last_upkeep_at: Option<DateTime<Utc>>,
    end_reason: Option<String>,
}

impl TryFrom<WarRow> for War {
    type Error = StoreError;

    fn try_from(row: WarRow) -> Result<Self, Self::Error> {
        let objectives: Vec<WarObjective> = serde_json::from_str(&row.objectives_json)?;
        Ok(War {
            id: parse_id(&row.id, "wars.id")?,
            declaring_guild_id: parse_id(&row.declaring_guild_id, "wars.declaring_guild_id")?,
            defending_guild_id: parse_id(&row.defending_guild_id, "wars.defending_guild_id")?,
            duration_secs: row.duration_secs,
            objectives,
            wager: row.wager,
            declaring_hold_id: parse_opt_id(
                row.declaring_hold_id.as_deref(),
                "wars.declaring_hold_id",
            )?,
            defending_hold_id: parse_opt_id(
                row.defending_hold_id.as_deref(),
                "wars.defending_hold_id",
            )?,
            status: parse_name(&row.status)?,
            declared_at: row.declared_at,
            acceptance_deadline: row.acceptance_deadline,
            started_at: row.started_at,
            expires_at: row.expires_at,
            ended_at: row.ended_at,
            winner: parse_opt_id(row.winner.as_deref(), "wars.winner")?,
            stats: WarStats {
                declaring_kills: parse_count(row.declaring_kills, "wars.declaring_kills")?,
                defending_kills: parse_count(row.defending_kills, "wars.defending_kills")?,
            },
            last_upkeep_at: row.last_upkeep_at,
            end_reason: row.end_reason,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct RequestRow {
    id: String,
    kind: String,
    from_guild_id: String,
    to_guild_id: String,
    actor_id: String,
    message: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for DiplomaticRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(DiplomaticRequest {
            id: parse_id(&row.id, "diplomatic_requests.id")?,
            kind: parse_name(&row.kind)?,
            from_guild_id: parse_id(&row.from_guild_id, "diplomatic_requests.from_guild_id")?,
            to_guild_id: parse_id(&row.to_guild_id, "diplomatic_requests.to_guild_id")?,
            actor_id: parse_id(&row.actor_id, "diplomatic_requests.actor_id")?,
            message: row.message,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct RelationRow {
    id: String,
    kind: String,
    guild_a: String,
    guild_b: String,
    established_at: DateTime<Utc>,
}

impl TryFrom<RelationRow> for DiplomaticRelation {
    type Error = StoreError;

    fn try_from(row: RelationRow) -> Result<Self, Self::Error> {
        Ok(DiplomaticRelation {
            id: parse_id(&row.id, "diplomatic_relations.id")?,
            kind: parse_name(&row.kind)?,
            guild_a: parse_id(&row.guild_a, "diplomatic_relations.guild_a")?,
            guild_b: parse_id(&row.guild_b, "diplomatic_relations.guild_b")?,
            established_at: row.established_at,
        })
    }
}

#[derive(FromRow)]
pub(crate) struct PeaceRow {
    id: String,
    war_id: String,
    proposing_guild_id: String,
    target_guild_id: String,
    terms: String,
    status: String,
    proposed_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}

impl TryFrom<PeaceRow> for PeaceProposal {
    type Error = StoreError;

    fn try_from(row: PeaceRow) -> Result<Self, Self::Error> {
        Ok(PeaceProposal {
            id: parse_id(&row.id, "peace_proposals.id")?,
            war_id: parse_id(&row.war_id, "peace_proposals.war_id")?,
            proposing_guild_id: parse_id(
                &row.proposing_guild_id,
                "peace_proposals.proposing_guild_id",
            )?,
            target_guild_id: parse_id(&row.target_guild_id, "peace_proposals.target_guild_id")?,
            terms: row.terms,
            status: parse_name(&row.status)?,
            proposed_at: row.proposed_at,
            expires_at: row.expires_at,
            responded_at: row.responded_at,
        })
    }
}

/// Convert a batch of rows, failing on the first bad one
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
