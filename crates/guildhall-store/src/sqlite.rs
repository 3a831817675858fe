//! Guild economy storage using SQLite
//!
//! Implements every repository trait from `guildhall-core` over one
//! connection pool. Ledger writes run inside a database transaction that
//! adjusts the cached balance first, so the guild row is write-locked
//! before anything is read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite, SqliteConnection};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use guildhall_core::{
    BankAudit, BankTransaction, DiplomacyStore, DiplomaticRelation, DiplomaticRequest,
    EscrowHold, EscrowStatus, Guild, GuildMode, GuildStore, LedgerStore, Member, MemberStore,
    PeaceProposal, Rank, RankStore, RelationType, War, WarStatus, WarStore,
};

use crate::error::{IntoCore, Result, StoreError};
use crate::rows::{
    convert_all, AuditRow, GuildRow, HoldRow, MemberRow, PeaceRow, RankRow, RelationRow,
    RequestRow, TransactionRow, WarRow,
};

type CoreResult<T> = guildhall_core::Result<T>;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS guilds (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        bank_balance INTEGER NOT NULL DEFAULT 0 CHECK (bank_balance >= 0),
        mode TEXT NOT NULL,
        mode_changed_at TIMESTAMP,
        emergency_freeze BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ranks (
        id TEXT PRIMARY KEY,
        guild_id TEXT NOT NULL,
        name TEXT NOT NULL,
        priority INTEGER NOT NULL,
        permissions_json TEXT NOT NULL,
        icon TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS members (
        player_id TEXT PRIMARY KEY,
        guild_id TEXT NOT NULL,
        rank_id TEXT NOT NULL,
        joined_at TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bank_transactions (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        guild_id TEXT NOT NULL,
        actor_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        amount INTEGER NOT NULL CHECK (amount > 0),
        fee INTEGER,
        description TEXT,
        timestamp TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS escrow_holds (
        id TEXT PRIMARY KEY,
        guild_id TEXT NOT NULL,
        actor_id TEXT NOT NULL,
        amount INTEGER NOT NULL CHECK (amount > 0),
        purpose TEXT NOT NULL,
        status TEXT NOT NULL,
        beneficiary_guild_id TEXT,
        created_at TIMESTAMP NOT NULL,
        resolved_at TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bank_audits (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        guild_id TEXT NOT NULL,
        actor_id TEXT NOT NULL,
        action TEXT NOT NULL,
        amount INTEGER,
        description TEXT,
        timestamp TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS wars (
        id TEXT PRIMARY KEY,
        declaring_guild_id TEXT NOT NULL,
        defending_guild_id TEXT NOT NULL,
        duration_secs INTEGER NOT NULL,
        objectives_json TEXT NOT NULL,
        wager INTEGER NOT NULL DEFAULT 0,
        declaring_hold_id TEXT,
        defending_hold_id TEXT,
        status TEXT NOT NULL,
        declared_at TIMESTAMP NOT NULL,
        acceptance_deadline TIMESTAMP,
        started_at TIMESTAMP,
        expires_at TIMESTAMP,
        ended_at TIMESTAMP,
        winner TEXT,
        declaring_kills INTEGER NOT NULL DEFAULT 0,
        defending_kills INTEGER NOT NULL DEFAULT 0,
        last_upkeep_at TIMESTAMP,
        end_reason TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS peace_proposals (
        id TEXT PRIMARY KEY,
        war_id TEXT NOT NULL,
        proposing_guild_id TEXT NOT NULL,
        target_guild_id TEXT NOT NULL,
        terms TEXT NOT NULL,
        status TEXT NOT NULL,
        proposed_at TIMESTAMP NOT NULL,
        expires_at TIMESTAMP NOT NULL,
        responded_at TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS diplomatic_requests (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        from_guild_id TEXT NOT NULL,
        to_guild_id TEXT NOT NULL,
        actor_id TEXT NOT NULL,
        message TEXT,
        created_at TIMESTAMP NOT NULL,
        expires_at TIMESTAMP NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS diplomatic_relations (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        guild_a TEXT NOT NULL,
        guild_b TEXT NOT NULL,
        established_at TIMESTAMP NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_ranks_guild ON ranks(guild_id)",
    "CREATE INDEX IF NOT EXISTS idx_members_guild ON members(guild_id)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_guild ON bank_transactions(guild_id)",
    "CREATE INDEX IF NOT EXISTS idx_holds_guild_status ON escrow_holds(guild_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_audits_guild ON bank_audits(guild_id)",
    "CREATE INDEX IF NOT EXISTS idx_wars_status ON wars(status)",
    "CREATE INDEX IF NOT EXISTS idx_wars_declaring ON wars(declaring_guild_id)",
    "CREATE INDEX IF NOT EXISTS idx_wars_defending ON wars(defending_guild_id)",
    "CREATE INDEX IF NOT EXISTS idx_peace_war ON peace_proposals(war_id)",
    "CREATE INDEX IF NOT EXISTS idx_peace_target ON peace_proposals(target_guild_id)",
    "CREATE INDEX IF NOT EXISTS idx_requests_expiry ON diplomatic_requests(expires_at)",
];

/// `LIMIT -1` means no limit in SQLite
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

/// Apply a transaction to the cached balance and append it to the log.
/// Must run inside a database transaction.
async fn apply(conn: &mut SqliteConnection, tx: &BankTransaction) -> CoreResult<i64> {
    let delta = tx.signed_amount();
    let guild_id = tx.guild_id.to_string();

    let updated = sqlx::query(
        "UPDATE guilds SET bank_balance = bank_balance + ? WHERE id = ? AND bank_balance + ? >= 0",
    )
    .bind(delta)
    .bind(&guild_id)
    .bind(delta)
    .execute(&mut *conn)
    .await
    .into_core()?;

    if updated.rows_affected() == 0 {
        let current: Option<i64> =
            sqlx::query_scalar("SELECT bank_balance FROM guilds WHERE id = ?")
                .bind(&guild_id)
                .fetch_optional(&mut *conn)
                .await
                .into_core()?;
        return Err(match current {
            None => guildhall_core::Error::GuildNotFound(tx.guild_id),
            Some(balance) => guildhall_core::Error::Invariant(format!(
                "transaction {} would leave guild {} at {}",
                tx.id,
                tx.guild_id,
                balance + delta
            )),
        });
    }

    sqlx::query(
        r#"
        INSERT INTO bank_transactions (
            id, guild_id, actor_id, kind, amount, fee, description, timestamp
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(tx.id.to_string())
    .bind(&guild_id)
    .bind(tx.actor_id.to_string())
    .bind(tx.kind.as_str())
    .bind(tx.amount)
    .bind(tx.fee)
    .bind(&tx.description)
    .bind(tx.timestamp)
    .execute(&mut *conn)
    .await
    .into_core()?;

    sqlx::query_scalar("SELECT bank_balance FROM guilds WHERE id = ?")
        .bind(&guild_id)
        .fetch_one(&mut *conn)
        .await
        .into_core()
}

/// SQLite-based guild economy store
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new store from database path
    pub async fn from_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::InvalidConfig(format!("Failed to create directory: {}", e))
            })?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        info!(path = %path.display(), "Opened guild database");
        Ok(store)
    }

    /// Create a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        // A single connection, since every `:memory:` connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Guild database schema is up to date");
        Ok(())
    }

    /// Close the pool, waiting for open connections to finish
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl GuildStore for SqliteStore {
    async fn insert_guild(&self, guild: &Guild) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO guilds (
                id, name, bank_balance, mode, mode_changed_at, emergency_freeze, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(guild.id.to_string())
        .bind(&guild.name)
        .bind(guild.bank_balance)
        .bind(guild.mode.as_str())
        .bind(guild.mode_changed_at)
        .bind(guild.emergency_freeze)
        .bind(guild.created_at)
        .execute(&self.pool)
        .await
        .into_core()?;
        Ok(())
    }

    async fn get_guild(&self, guild_id: Uuid) -> CoreResult<Option<Guild>> {
        let row: Option<GuildRow> = sqlx::query_as("SELECT * FROM guilds WHERE id = ?")
            .bind(guild_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .into_core()?;
        row.map(Guild::try_from).transpose().into_core()
    }

    async fn find_guild_by_name(&self, name: &str) -> CoreResult<Option<Guild>> {
        let row: Option<GuildRow> = sqlx::query_as("SELECT * FROM guilds WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .into_core()?;
        row.map(Guild::try_from).transpose().into_core()
    }

    async fn list_guilds(&self) -> CoreResult<Vec<Guild>> {
        let rows: Vec<GuildRow> = sqlx::query_as("SELECT * FROM guilds ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .into_core()?;
        convert_all(rows).into_core()
    }

    async fn set_mode(
        &self,
        guild_id: Uuid,
        mode: GuildMode,
        changed_at: DateTime<Utc>,
    ) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE guilds SET mode = ?, mode_changed_at = ? WHERE id = ?")
            .bind(mode.as_str())
            .bind(changed_at)
            .bind(guild_id.to_string())
            .execute(&self.pool)
            .await
            .into_core()?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_emergency_freeze(&self, guild_id: Uuid, frozen: bool) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE guilds SET emergency_freeze = ? WHERE id = ?")
            .bind(frozen)
            .bind(guild_id.to_string())
            .execute(&self.pool)
            .await
            .into_core()?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_guild(&self, guild_id: Uuid) -> CoreResult<bool> {
        let id = guild_id.to_string();
        let mut tx = self.pool.begin().await.into_core()?;

        let deleted = sqlx::query("DELETE FROM guilds WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .into_core()?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        for statement in [
            "DELETE FROM members WHERE guild_id = ?1",
            "DELETE FROM ranks WHERE guild_id = ?1",
            "DELETE FROM bank_transactions WHERE guild_id = ?1",
            "DELETE FROM bank_audits WHERE guild_id = ?1",
            "DELETE FROM escrow_holds WHERE guild_id = ?1",
            "DELETE FROM wars WHERE (declaring_guild_id = ?1 OR defending_guild_id = ?1) \
             AND status IN ('PENDING_ACCEPTANCE', 'ACTIVE')",
            "DELETE FROM peace_proposals WHERE (proposing_guild_id = ?1 OR target_guild_id = ?1) \
             AND war_id NOT IN (SELECT id FROM wars)",
            "DELETE FROM diplomatic_requests WHERE from_guild_id = ?1 OR to_guild_id = ?1",
            "DELETE FROM diplomatic_relations WHERE guild_a = ?1 OR guild_b = ?1",
        ] {
            sqlx::query(statement)
                .bind(&id)
                .execute(&mut *tx)
                .await
                .into_core()?;
        }

        tx.commit().await.into_core()?;
        Ok(true)
    }
}

#[async_trait]
impl MemberStore for SqliteStore {
    async fn insert_member(&self, member: &Member) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO members (player_id, guild_id, rank_id, joined_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(player_id) DO NOTHING
            "#,
        )
        .bind(member.player_id.to_string())
        .bind(member.guild_id.to_string())
        .bind(member.rank_id.to_string())
        .bind(member.joined_at)
        .execute(&self.pool)
        .await
        .into_core()?;

        if result.rows_affected() == 0 {
            return Err(guildhall_core::Error::Invariant(format!(
                "player {} already belongs to a guild",
                member.player_id
            )));
        }
        Ok(())
    }

    async fn get_member(&self, guild_id: Uuid, player_id: Uuid) -> CoreResult<Option<Member>> {
        let row: Option<MemberRow> =
            sqlx::query_as("SELECT * FROM members WHERE player_id = ? AND guild_id = ?")
                .bind(player_id.to_string())
                .bind(guild_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .into_core()?;
        row.map(Member::try_from).transpose().into_core()
    }

    async fn find_membership(&self, player_id: Uuid) -> CoreResult<Option<Member>> {
        let row: Option<MemberRow> = sqlx::query_as("SELECT * FROM members WHERE player_id = ?")
            .bind(player_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .into_core()?;
        row.map(Member::try_from).transpose().into_core()
    }

    async fn list_members(&self, guild_id: Uuid) -> CoreResult<Vec<Member>> {
        let rows: Vec<MemberRow> =
            sqlx::query_as("SELECT * FROM members WHERE guild_id = ? ORDER BY joined_at")
                .bind(guild_id.to_string())
                .fetch_all(&self.pool)
                .await
                .into_core()?;
        convert_all(rows).into_core()
    }

    async fn set_member_rank(
        &self,
        guild_id: Uuid,
        player_id: Uuid,
        rank_id: Uuid,
    ) -> CoreResult<bool> {
        let result =
            sqlx::query("UPDATE members SET rank_id = ? WHERE player_id = ? AND guild_id = ?")
                .bind(rank_id.to_string())
                .bind(player_id.to_string())
                .bind(guild_id.to_string())
                .execute(&self.pool)
                .await
                .into_core()?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_member(&self, guild_id: Uuid, player_id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM members WHERE player_id = ? AND guild_id = ?")
            .bind(player_id.to_string())
            .bind(guild_id.to_string())
            .execute(&self.pool)
            .await
            .into_core()?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RankStore for SqliteStore {
    async fn insert_rank(&self, rank: &Rank) -> CoreResult<()> {
        let permissions_json = serde_json::to_string(&rank.permissions).into_core()?;

        sqlx::query(
            r#"
            INSERT INTO ranks (id, guild_id, name, priority, permissions_json, icon)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rank.id.to_string())
        .bind(rank.guild_id.to_string())
        .bind(&rank.name)
        .bind(rank.priority)
        .bind(permissions_json)
        .bind(&rank.icon)
        .execute(&self.pool)
        .await
        .into_core()?;
        Ok(())
    }

    async fn get_rank(&self, rank_id: Uuid) -> CoreResult<Option<Rank>> {
        let row: Option<RankRow> = sqlx::query_as("SELECT * FROM ranks WHERE id = ?")
            .bind(rank_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .into_core()?;
        row.map(Rank::try_from).transpose().into_core()
    }

    async fn list_ranks(&self, guild_id: Uuid) -> CoreResult<Vec<Rank>> {
        let rows: Vec<RankRow> =
            sqlx::query_as("SELECT * FROM ranks WHERE guild_id = ? ORDER BY priority ASC")
                .bind(guild_id.to_string())
                .fetch_all(&self.pool)
                .await
                .into_core()?;
        convert_all(rows).into_core()
    }

    async fn update_rank(&self, rank: &Rank) -> CoreResult<bool> {
        let permissions_json = serde_json::to_string(&rank.permissions).into_core()?;

        let result = sqlx::query(
            r#"
            UPDATE ranks SET name = ?, priority = ?, permissions_json = ?, icon = ?
            WHERE id = ?
            "#,
        )
        .bind(&rank.name)
        .bind(rank.priority)
        .bind(permissions_json)
        .bind(&rank.icon)
        .bind(rank.id.to_string())
        .execute(&self.pool)
        .await
        .into_core()?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_rank(&self, rank_id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM ranks WHERE id = ?")
            .bind(rank_id.to_string())
            .execute(&self.pool)
            .await
            .into_core()?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn append_transaction(&self, tx: &BankTransaction) -> CoreResult<i64> {
        let mut db = self.pool.begin().await.into_core()?;
        let balance = apply(&mut *db, tx).await?;
        db.commit().await.into_core()?;
        Ok(balance)
    }

    async fn balance(&self, guild_id: Uuid) -> CoreResult<Option<i64>> {
        sqlx::query_scalar("SELECT bank_balance FROM guilds WHERE id = ?")
            .bind(guild_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .into_core()
    }

    async fn list_transactions(
        &self,
        guild_id: Uuid,
        limit: Option<usize>,
    ) -> CoreResult<Vec<BankTransaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            "SELECT * FROM bank_transactions WHERE guild_id = ? ORDER BY seq DESC LIMIT ?",
        )
        .bind(guild_id.to_string())
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .into_core()?;
        convert_all(rows).into_core()
    }

    async fn open_escrow(&self, hold: &EscrowHold, debit: &BankTransaction) -> CoreResult<i64> {
        let mut db = self.pool.begin().await.into_core()?;
        let balance = apply(&mut *db, debit).await?;

        sqlx::query(
            r#"
            INSERT INTO escrow_holds (
                id, guild_id, actor_id, amount, purpose, status,
                beneficiary_guild_id, created_at, resolved_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(hold.id.to_string())
        .bind(hold.guild_id.to_string())
        .bind(hold.actor_id.to_string())
        .bind(hold.amount)
        .bind(&hold.purpose)
        .bind(hold.status.as_str())
        .bind(hold.beneficiary_guild_id.map(|id| id.to_string()))
        .bind(hold.created_at)
        .bind(hold.resolved_at)
        .execute(&mut *db)
        .await
        .into_core()?;

        db.commit().await.into_core()?;
        Ok(balance)
    }

    async fn settle_escrow(
        &self,
        hold_id: Uuid,
        status: EscrowStatus,
        beneficiary_guild_id: Uuid,
        credit: &BankTransaction,
    ) -> CoreResult<Option<i64>> {
        let id = hold_id.to_string();
        let mut db = self.pool.begin().await.into_core()?;

        let updated = sqlx::query(
            r#"
            UPDATE escrow_holds
            SET status = ?, beneficiary_guild_id = ?, resolved_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(status.as_str())
        .bind(beneficiary_guild_id.to_string())
        .bind(credit.timestamp)
        .bind(&id)
        .bind(EscrowStatus::Held.as_str())
        .execute(&mut *db)
        .await
        .into_core()?;

        if updated.rows_affected() == 0 {
            let exists: Option<String> =
                sqlx::query_scalar("SELECT id FROM escrow_holds WHERE id = ?")
                    .bind(&id)
                    .fetch_optional(&mut *db)
                    .await
                    .into_core()?;
            return match exists {
                Some(_) => Ok(None),
                None => Err(guildhall_core::Error::EscrowNotFound(hold_id)),
            };
        }

        let balance = apply(&mut *db, credit).await?;
        db.commit().await.into_core()?;
        Ok(Some(balance))
    }

    async fn get_hold(&self, hold_id: Uuid) -> CoreResult<Option<EscrowHold>> {
        let row: Option<HoldRow> = sqlx::query_as("SELECT * FROM escrow_holds WHERE id = ?")
            .bind(hold_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .into_core()?;
        row.map(EscrowHold::try_from).transpose().into_core()
    }

    async fn list_open_holds(&self, guild_id: Uuid) -> CoreResult<Vec<EscrowHold>> {
        let rows: Vec<HoldRow> = sqlx::query_as(
            "SELECT * FROM escrow_holds WHERE guild_id = ? AND status = ? ORDER BY created_at",
        )
        .bind(guild_id.to_string())
        .bind(EscrowStatus::Held.as_str())
        .fetch_all(&self.pool)
        .await
        .into_core()?;
        convert_all(rows).into_core()
    }

    async fn insert_audit(&self, entry: &BankAudit) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bank_audits (
                id, guild_id, actor_id, action, amount, description, timestamp
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.guild_id.to_string())
        .bind(entry.actor_id.to_string())
        .bind(entry.action.as_str())
        .bind(entry.amount)
        .bind(&entry.description)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .into_core()?;
        Ok(())
    }

    async fn list_audits(
        &self,
        guild_id: Uuid,
        limit: Option<usize>,
    ) -> CoreResult<Vec<BankAudit>> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            "SELECT * FROM bank_audits WHERE guild_id = ? ORDER BY seq DESC LIMIT ?",
        )
        .bind(guild_id.to_string())
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await
        .into_core()?;
        convert_all(rows).into_core()
    }
}

#[async_trait]
impl WarStore for SqliteStore {
    async fn insert_war(&self, war: &War) -> CoreResult<()> {
        let objectives_json = serde_json::to_string(&war.objectives).into_core()?;

        sqlx::query(
            r#"
            INSERT INTO wars (
                id, declaring_guild_id, defending_guild_id, duration_secs, objectives_json,
                wager, declaring_hold_id, defending_hold_id, status, declared_at,
                acceptance_deadline, started_at, expires_at, ended_at, winner,
                declaring_kills, defending_kills, last_upkeep_at, end_reason
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(war.id.to_string())
        .bind(war.declaring_guild_id.to_string())
        .bind(war.defending_guild_id.to_string())
        .bind(war.duration_secs)
        .bind(objectives_json)
        .bind(war.wager)
        .bind(war.declaring_hold_id.map(|id| id.to_string()))
        .bind(war.defending_hold_id.map(|id| id.to_string()))
        .bind(war.status.as_str())
        .bind(war.declared_at)
        .bind(war.acceptance_deadline)
        .bind(war.started_at)
        .bind(war.expires_at)
        .bind(war.ended_at)
        .bind(war.winner.map(|id| id.to_string()))
        .bind(i64::from(war.stats.declaring_kills))
        .bind(i64::from(war.stats.defending_kills))
        .bind(war.last_upkeep_at)
        .bind(&war.end_reason)
        .execute(&self.pool)
        .await
        .into_core()?;
        Ok(())
    }

    async fn get_war(&self, war_id: Uuid) -> CoreResult<Option<War>> {
        let row: Option<WarRow> = sqlx::query_as("SELECT * FROM wars WHERE id = ?")
            .bind(war_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .into_core()?;
        row.map(War::try_from).transpose().into_core()
    }

    async fn update_war(&self, war: &War) -> CoreResult<bool> {
        let objectives_json = serde_json::to_string(&war.objectives).into_core()?;

        let result = sqlx::query(
            r#"
            UPDATE wars SET
                objectives_json = ?, wager = ?, declaring_hold_id = ?, defending_hold_id = ?,
                status = ?, acceptance_deadline = ?, started_at = ?, expires_at = ?,
                ended_at = ?, winner = ?, declaring_kills = ?, defending_kills = ?,
                last_upkeep_at = ?, end_reason = ?
            WHERE id = ?
            "#,
        )
        .bind(objectives_json)
        .bind(war.wager)
        .bind(war.declaring_hold_id.map(|id| id.to_string()))
        .bind(war.defending_hold_id.map(|id| id.to_string()))
        .bind(war.status.as_str())
        .bind(war.acceptance_deadline)
        .bind(war.started_at)
        .bind(war.expires_at)
        .bind(war.ended_at)
        .bind(war.winner.map(|id| id.to_string()))
        .bind(i64::from(war.stats.declaring_kills))
        .bind(i64::from(war.stats.defending_kills))
        .bind(war.last_upkeep_at)
        .bind(&war.end_reason)
        .bind(war.id.to_string())
        .execute(&self.pool)
        .await
        .into_core()?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_wars_for_guild(&self, guild_id: Uuid) -> CoreResult<Vec<War>> {
        let rows: Vec<WarRow> = sqlx::query_as(
            r#"
            SELECT * FROM wars
            WHERE declaring_guild_id = ?1 OR defending_guild_id = ?1
            ORDER BY declared_at DESC
            "#,
        )
        .bind(guild_id.to_string())
        .fetch_all(&self.pool)
        .await
        .into_core()?;
        convert_all(rows).into_core()
    }

    async fn find_open_war_between(&self, a: Uuid, b: Uuid) -> CoreResult<Option<War>> {
        let row: Option<WarRow> = sqlx::query_as(
            r#"
            SELECT * FROM wars
            WHERE status IN (?3, ?4)
              AND ((declaring_guild_id = ?1 AND defending_guild_id = ?2)
                OR (declaring_guild_id = ?2 AND defending_guild_id = ?1))
            LIMIT 1
            "#,
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .bind(WarStatus::PendingAcceptance.as_str())
        .bind(WarStatus::Active.as_str())
        .fetch_optional(&self.pool)
        .await
        .into_core()?;
        row.map(War::try_from).transpose().into_core()
    }

    async fn list_open_wars(&self) -> CoreResult<Vec<War>> {
        let rows: Vec<WarRow> =
            sqlx::query_as("SELECT * FROM wars WHERE status IN (?, ?) ORDER BY declared_at")
                .bind(WarStatus::PendingAcceptance.as_str())
                .bind(WarStatus::Active.as_str())
                .fetch_all(&self.pool)
                .await
                .into_core()?;
        convert_all(rows).into_core()
    }

    async fn insert_peace_proposal(&self, proposal: &PeaceProposal) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO peace_proposals (
                id, war_id, proposing_guild_id, target_guild_id, terms, status,
                proposed_at, expires_at, responded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(proposal.id.to_string())
        .bind(proposal.war_id.to_string())
        .bind(proposal.proposing_guild_id.to_string())
        .bind(proposal.target_guild_id.to_string())
        .bind(&proposal.terms)
        .bind(proposal.status.as_str())
        .bind(proposal.proposed_at)
        .bind(proposal.expires_at)
        .bind(proposal.responded_at)
        .execute(&self.pool)
        .await
        .into_core()?;
        Ok(())
    }

    async fn get_peace_proposal(&self, proposal_id: Uuid) -> CoreResult<Option<PeaceProposal>> {
        let row: Option<PeaceRow> = sqlx::query_as("SELECT * FROM peace_proposals WHERE id = ?")
            .bind(proposal_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .into_core()?;
        row.map(PeaceProposal::try_from).transpose().into_core()
    }

    async fn update_peace_proposal(&self, proposal: &PeaceProposal) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE peace_proposals SET terms = ?, status = ?, expires_at = ?, responded_at = ? \
             WHERE id = ?",
        )
        .bind(&proposal.terms)
        .bind(proposal.status.as_str())
        .bind(proposal.expires_at)
        .bind(proposal.responded_at)
        .bind(proposal.id.to_string())
        .execute(&self.pool)
        .await
        .into_core()?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_peace_proposals_for_war(&self, war_id: Uuid) -> CoreResult<Vec<PeaceProposal>> {
        let rows: Vec<PeaceRow> =
            sqlx::query_as("SELECT * FROM peace_proposals WHERE war_id = ? ORDER BY proposed_at")
                .bind(war_id.to_string())
                .fetch_all(&self.pool)
                .await
                .into_core()?;
        convert_all(rows).into_core()
    }

    async fn list_peace_proposals_for_target(
        &self,
        guild_id: Uuid,
    ) -> CoreResult<Vec<PeaceProposal>> {
        let rows: Vec<PeaceRow> = sqlx::query_as(
            "SELECT * FROM peace_proposals WHERE target_guild_id = ? ORDER BY proposed_at",
        )
        .bind(guild_id.to_string())
        .fetch_all(&self.pool)
        .await
        .into_core()?;
        convert_all(rows).into_core()
    }
}

#[async_trait]
impl DiplomacyStore for SqliteStore {
    async fn insert_request(&self, request: &DiplomaticRequest) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO diplomatic_requests (
                id, kind, from_guild_id, to_guild_id, actor_id, message, created_at, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.id.to_string())
        .bind(request.kind.as_str())
        .bind(request.from_guild_id.to_string())
        .bind(request.to_guild_id.to_string())
        .bind(request.actor_id.to_string())
        .bind(&request.message)
        .bind(request.created_at)
        .bind(request.expires_at)
        .execute(&self.pool)
        .await
        .into_core()?;
        Ok(())
    }

    async fn get_request(&self, request_id: Uuid) -> CoreResult<Option<DiplomaticRequest>> {
        let row: Option<RequestRow> =
            sqlx::query_as("SELECT * FROM diplomatic_requests WHERE id = ?")
                .bind(request_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .into_core()?;
        row.map(DiplomaticRequest::try_from).transpose().into_core()
    }

    async fn list_requests_for_guild(&self, guild_id: Uuid) -> CoreResult<Vec<DiplomaticRequest>> {
        let rows: Vec<RequestRow> = sqlx::query_as(
            r#"
            SELECT * FROM diplomatic_requests
            WHERE from_guild_id = ?1 OR to_guild_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(guild_id.to_string())
        .fetch_all(&self.pool)
        .await
        .into_core()?;
        convert_all(rows).into_core()
    }

    async fn delete_request(&self, request_id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM diplomatic_requests WHERE id = ?")
            .bind(request_id.to_string())
            .execute(&self.pool)
            .await
            .into_core()?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_requests(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        let result = sqlx::query("DELETE FROM diplomatic_requests WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .into_core()?;
        Ok(result.rows_affected() as usize)
    }

    async fn insert_relation(&self, relation: &DiplomaticRelation) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO diplomatic_relations (id, kind, guild_a, guild_b, established_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(relation.id.to_string())
        .bind(relation.kind.as_str())
        .bind(relation.guild_a.to_string())
        .bind(relation.guild_b.to_string())
        .bind(relation.established_at)
        .execute(&self.pool)
        .await
        .into_core()?;
        Ok(())
    }

    async fn list_relations(&self, guild_id: Uuid) -> CoreResult<Vec<DiplomaticRelation>> {
        let rows: Vec<RelationRow> = sqlx::query_as(
            r#"
            SELECT * FROM diplomatic_relations
            WHERE guild_a = ?1 OR guild_b = ?1
            ORDER BY established_at
            "#,
        )
        .bind(guild_id.to_string())
        .fetch_all(&self.pool)
        .await
        .into_core()?;
        convert_all(rows).into_core()
    }

    async fn find_relation(
        &self,
        a: Uuid,
        b: Uuid,
        kind: RelationType,
    ) -> CoreResult<Option<DiplomaticRelation>> {
        let row: Option<RelationRow> = sqlx::query_as(
            r#"
            SELECT * FROM diplomatic_relations
            WHERE kind = ?3
              AND ((guild_a = ?1 AND guild_b = ?2) OR (guild_a = ?2 AND guild_b = ?1))
            LIMIT 1
            "#,
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .into_core()?;
        row.map(DiplomaticRelation::try_from).transpose().into_core()
    }
}
