//! Bank ledger service
//!
//! Every balance-changing call runs under the guild's ledger lock, so the
//! balance check and the debit form one step. The ledger never calls back
//! into ranks-mutating or war code while holding a lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    AuditAction, BankAudit, BankStats, BankTransaction, EscrowHold, EscrowStatus,
    MemberContribution, TransactionType, SYSTEM_ACTOR,
};
use crate::config::BankConfig;
use crate::error::{Error, Result};
use crate::locks::GuildLocks;
use crate::ranks::{RankAuthority, RankPermission};
use crate::store::{GuildStore, LedgerStore};

/// Guild bank service
pub struct BankLedger {
    store: Arc<dyn LedgerStore>,
    guilds: Arc<dyn GuildStore>,
    ranks: Arc<RankAuthority>,
    locks: GuildLocks,
    config: BankConfig,
}

fn ensure_positive(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(Error::InvalidAmount(amount));
    }
    Ok(())
}

impl BankLedger {
    /// Create a ledger
    pub fn new(
        store: Arc<dyn LedgerStore>,
        guilds: Arc<dyn GuildStore>,
        ranks: Arc<RankAuthority>,
        config: BankConfig,
    ) -> Self {
        Self {
            store,
            guilds,
            ranks,
            locks: GuildLocks::new(),
            config,
        }
    }

    /// Active settings
    #[must_use]
    pub fn config(&self) -> &BankConfig {
        &self.config
    }

    async fn audit(&self, entry: BankAudit) {
        if let Err(e) = self.store.insert_audit(&entry).await {
            warn!(guild = %entry.guild_id, action = entry.action.as_str(), "Failed to write bank audit: {}", e);
        }
    }

    async fn deny(&self, guild_id: Uuid, actor_id: Uuid, permission: RankPermission) {
        warn!(guild = %guild_id, actor = %actor_id, permission = %permission, "Bank operation denied");
        self.audit(
            BankAudit::new(guild_id, actor_id, AuditAction::PermissionDenied)
                .with_description(format!("missing {}", permission)),
        )
        .await;
    }

    /// Whether the guild bank is frozen; `None` when the guild is unknown
    async fn frozen(&self, guild_id: Uuid) -> Result<Option<bool>> {
        Ok(self
            .guilds
            .get_guild(guild_id)
            .await?
            .map(|g| g.emergency_freeze))
    }

    /// Shared gate for member-initiated movements: guild exists, not frozen,
    /// actor holds `permission`.
    async fn admit(
        &self,
        guild_id: Uuid,
        actor_id: Uuid,
        permission: RankPermission,
        amount: i64,
    ) -> Result<bool> {
        match self.frozen(guild_id).await? {
            None => {
                warn!(guild = %guild_id, "Bank operation on unknown guild");
                return Ok(false);
            }
            Some(true) => {
                warn!(guild = %guild_id, actor = %actor_id, "Bank is frozen");
                self.audit(
                    BankAudit::new(guild_id, actor_id, AuditAction::FrozenRejected)
                        .with_amount(amount),
                )
                .await;
                return Ok(false);
            }
            Some(false) => {}
        }
        if !self
            .ranks
            .has_permission(actor_id, guild_id, permission)
            .await?
        {
            self.deny(guild_id, actor_id, permission).await;
            return Ok(false);
        }
        Ok(true)
    }

    async fn current_balance(&self, guild_id: Uuid) -> Result<i64> {
        self.store
            .balance(guild_id)
            .await?
            .ok_or(Error::GuildNotFound(guild_id))
    }

    // ── Member movements ───────────────────────────────────────────────

    /// Deposit funds. Returns `None` when the actor lacks `DEPOSIT_TO_BANK`,
    /// the bank is frozen, or the amount is outside the configured bounds.
    pub async fn deposit(
        &self,
        guild_id: Uuid,
        actor_id: Uuid,
        amount: i64,
        description: Option<&str>,
    ) -> Result<Option<BankTransaction>> {
        ensure_positive(amount)?;
        let _guard = self.locks.lock(guild_id).await;

        if !self
            .admit(guild_id, actor_id, RankPermission::DepositToBank, amount)
            .await?
        {
            return Ok(None);
        }
        if amount < self.config.min_deposit || amount > self.config.max_deposit {
            debug!(guild = %guild_id, amount, "Deposit outside configured bounds");
            return Ok(None);
        }

        let mut tx = BankTransaction::new(guild_id, actor_id, TransactionType::Deposit, amount);
        if let Some(desc) = description {
            tx = tx.with_description(desc);
        }
        let balance = self.store.append_transaction(&tx).await?;
        self.audit(BankAudit::new(guild_id, actor_id, AuditAction::Deposit).with_amount(amount))
            .await;

        info!(guild = %guild_id, actor = %actor_id, amount, balance, "Deposit recorded");
        Ok(Some(tx))
    }

    /// Withdraw funds. The balance must cover the amount plus the fee.
    /// Returns `None` on insufficient funds, missing `WITHDRAW_FROM_BANK`,
    /// or a frozen bank.
    pub async fn withdraw(
        &self,
        guild_id: Uuid,
        actor_id: Uuid,
        amount: i64,
        description: Option<&str>,
    ) -> Result<Option<BankTransaction>> {
        ensure_positive(amount)?;
        let _guard = self.locks.lock(guild_id).await;

        if !self
            .admit(guild_id, actor_id, RankPermission::WithdrawFromBank, amount)
            .await?
        {
            return Ok(None);
        }

        let fee = self.config.withdrawal_fee(amount);
        let balance = self.current_balance(guild_id).await?;
        if amount.checked_add(fee).map_or(true, |total| total > balance) {
            warn!(guild = %guild_id, actor = %actor_id, amount, fee, balance, "Insufficient funds");
            self.audit(
                BankAudit::new(guild_id, actor_id, AuditAction::InsufficientFunds)
                    .with_amount(amount),
            )
            .await;
            return Ok(None);
        }

        let mut tx = BankTransaction::new(guild_id, actor_id, TransactionType::Withdrawal, amount);
        if fee > 0 {
            tx = tx.with_fee(fee);
        }
        if let Some(desc) = description {
            tx = tx.with_description(desc);
        }
        let mut balance = self.store.append_transaction(&tx).await?;
        self.audit(
            BankAudit::new(guild_id, actor_id, AuditAction::Withdrawal).with_amount(amount),
        )
        .await;

        if fee > 0 {
            let fee_tx = BankTransaction::new(guild_id, actor_id, TransactionType::Fee, fee)
                .with_description(format!("Withdrawal fee for {}", tx.id));
            balance = self.store.append_transaction(&fee_tx).await?;
            self.audit(BankAudit::new(guild_id, actor_id, AuditAction::FeeCharged).with_amount(fee))
                .await;
        }

        info!(guild = %guild_id, actor = %actor_id, amount, fee, balance, "Withdrawal recorded");
        Ok(Some(tx))
    }

    /// System deduction such as war upkeep. Returns `None` if the balance
    /// does not cover it or the bank is frozen.
    pub async fn deduct(
        &self,
        guild_id: Uuid,
        amount: i64,
        description: &str,
    ) -> Result<Option<BankTransaction>> {
        ensure_positive(amount)?;
        let _guard = self.locks.lock(guild_id).await;

        if self.frozen(guild_id).await? != Some(false) {
            return Ok(None);
        }
        let balance = self.current_balance(guild_id).await?;
        if amount > balance {
            debug!(guild = %guild_id, amount, balance, "Deduction skipped: insufficient funds");
            return Ok(None);
        }

        let tx = BankTransaction::new(guild_id, SYSTEM_ACTOR, TransactionType::Deduction, amount)
            .with_description(description);
        let balance = self.store.append_transaction(&tx).await?;
        info!(guild = %guild_id, amount, balance, reason = description, "Deduction recorded");
        Ok(Some(tx))
    }

    // ── Escrow ─────────────────────────────────────────────────────────

    /// Move funds into a hold. Fails softly exactly like `withdraw`
    /// (no fee is charged).
    pub async fn hold_escrow(
        &self,
        guild_id: Uuid,
        actor_id: Uuid,
        amount: i64,
        purpose: &str,
    ) -> Result<Option<EscrowHold>> {
        ensure_positive(amount)?;
        let _guard = self.locks.lock(guild_id).await;

        if !self
            .admit(guild_id, actor_id, RankPermission::WithdrawFromBank, amount)
            .await?
        {
            return Ok(None);
        }
        let balance = self.current_balance(guild_id).await?;
        if amount > balance {
            warn!(guild = %guild_id, amount, balance, "Escrow hold refused: insufficient funds");
            self.audit(
                BankAudit::new(guild_id, actor_id, AuditAction::InsufficientFunds)
                    .with_amount(amount),
            )
            .await;
            return Ok(None);
        }

        let hold = EscrowHold::new(guild_id, actor_id, amount, purpose);
        let debit = BankTransaction::new(guild_id, actor_id, TransactionType::Deduction, amount)
            .with_description(format!("Escrow hold: {}", purpose));
        let balance = self.store.open_escrow(&hold, &debit).await?;
        self.audit(
            BankAudit::new(guild_id, actor_id, AuditAction::EscrowHeld)
                .with_amount(amount)
                .with_description(purpose),
        )
        .await;

        info!(guild = %guild_id, hold = %hold.id, amount, balance, purpose, "Escrow held");
        Ok(Some(hold))
    }

    /// Credit a held amount to `beneficiary_guild_id`.
    /// Returns `false` if the hold was already settled.
    pub async fn capture_escrow(&self, hold_id: Uuid, beneficiary_guild_id: Uuid) -> Result<bool> {
        self.settle(hold_id, EscrowStatus::Captured, Some(beneficiary_guild_id))
            .await
    }

    /// Refund a held amount to the guild it came from.
    /// Returns `false` if the hold was already settled.
    pub async fn release_escrow(&self, hold_id: Uuid) -> Result<bool> {
        self.settle(hold_id, EscrowStatus::Released, None).await
    }

    // Settlement ignores the freeze flag: the funds already left the bank
    // and must land somewhere.
    async fn settle(
        &self,
        hold_id: Uuid,
        status: EscrowStatus,
        beneficiary: Option<Uuid>,
    ) -> Result<bool> {
        let hold = self
            .store
            .get_hold(hold_id)
            .await?
            .ok_or(Error::EscrowNotFound(hold_id))?;
        let target = beneficiary.unwrap_or(hold.guild_id);
        let _guard = self.locks.lock(target).await;

        if !hold.is_open() {
            debug!(hold = %hold_id, status = hold.status.as_str(), "Escrow already settled");
            return Ok(false);
        }

        let (label, action) = match status {
            EscrowStatus::Captured => ("Escrow capture", AuditAction::EscrowCaptured),
            EscrowStatus::Released => ("Escrow release", AuditAction::EscrowReleased),
            EscrowStatus::Held => {
                return Err(Error::Invariant(format!(
                    "hold {} cannot be settled back into the held state",
                    hold_id
                )))
            }
        };
        let credit = BankTransaction::new(target, SYSTEM_ACTOR, TransactionType::Deposit, hold.amount)
            .with_description(format!("{}: {}", label, hold.purpose));

        let Some(balance) = self
            .store
            .settle_escrow(hold_id, status, target, &credit)
            .await?
        else {
            debug!(hold = %hold_id, "Escrow settled concurrently");
            return Ok(false);
        };
        self.audit(
            BankAudit::new(target, hold.actor_id, action)
                .with_amount(hold.amount)
                .with_description(hold.purpose.clone()),
        )
        .await;

        info!(
            hold = %hold_id,
            origin = %hold.guild_id,
            beneficiary = %target,
            amount = hold.amount,
            balance,
            "{}",
            label
        );
        Ok(true)
    }

    /// Holds of a guild awaiting settlement
    pub async fn get_open_holds(&self, guild_id: Uuid) -> Result<Vec<EscrowHold>> {
        self.store.list_open_holds(guild_id).await
    }

    /// A hold by ID
    pub async fn get_hold(&self, hold_id: Uuid) -> Result<Option<EscrowHold>> {
        self.store.get_hold(hold_id).await
    }

    // ── Emergency freeze ───────────────────────────────────────────────

    /// Turn the emergency freeze on or off. Requires
    /// `ACTIVATE_EMERGENCY_FREEZE` or `DEACTIVATE_EMERGENCY_FREEZE`.
    pub async fn set_emergency_freeze(
        &self,
        guild_id: Uuid,
        actor_id: Uuid,
        frozen: bool,
    ) -> Result<bool> {
        let _guard = self.locks.lock(guild_id).await;

        let Some(current) = self.frozen(guild_id).await? else {
            return Ok(false);
        };
        let (permission, action) = if frozen {
            (
                RankPermission::ActivateEmergencyFreeze,
                AuditAction::EmergencyFreezeActivated,
            )
        } else {
            (
                RankPermission::DeactivateEmergencyFreeze,
                AuditAction::EmergencyFreezeDeactivated,
            )
        };
        if !self
            .ranks
            .has_permission(actor_id, guild_id, permission)
            .await?
        {
            self.deny(guild_id, actor_id, permission).await;
            return Ok(false);
        }
        if current == frozen {
            return Ok(false);
        }

        self.guilds.set_emergency_freeze(guild_id, frozen).await?;
        self.audit(BankAudit::new(guild_id, actor_id, action)).await;
        warn!(guild = %guild_id, actor = %actor_id, frozen, "Emergency freeze changed");
        Ok(true)
    }

    /// Whether the guild bank is frozen
    pub async fn is_frozen(&self, guild_id: Uuid) -> Result<bool> {
        Ok(self.frozen(guild_id).await?.unwrap_or(false))
    }

    // ── Reports ────────────────────────────────────────────────────────

    /// Authoritative balance
    pub async fn get_balance(&self, guild_id: Uuid) -> Result<i64> {
        self.current_balance(guild_id).await
    }

    /// Balance as it stood at `at`, replayed from the log
    pub async fn get_balance_at_time(&self, guild_id: Uuid, at: DateTime<Utc>) -> Result<i64> {
        self.current_balance(guild_id).await?;
        let log = self.store.list_transactions(guild_id, None).await?;
        Ok(log
            .iter()
            .filter(|tx| tx.timestamp <= at)
            .map(BankTransaction::signed_amount)
            .sum())
    }

    /// Suggested ceiling for a single withdrawal by `actor_id`: what the
    /// balance covers with the fee, capped by `max_withdrawal_percent` of
    /// the balance and `daily_withdrawal_limit`. Zero when the actor may
    /// not withdraw or the bank is frozen.
    pub async fn get_max_withdrawal_amount(&self, guild_id: Uuid, actor_id: Uuid) -> Result<i64> {
        if self.frozen(guild_id).await? != Some(false) {
            return Ok(0);
        }
        if !self
            .ranks
            .has_permission(actor_id, guild_id, RankPermission::WithdrawFromBank)
            .await?
        {
            return Ok(0);
        }
        let balance = self.current_balance(guild_id).await?;
        let share = (balance as f64 * self.config.max_withdrawal_percent).floor() as i64;
        Ok(self
            .config
            .max_affordable_withdrawal(balance)
            .min(share)
            .min(self.config.daily_withdrawal_limit)
            .max(0))
    }

    /// Whether moving `amount` calls for a second officer's approval
    #[must_use]
    pub fn requires_dual_auth(&self, amount: i64) -> bool {
        self.config.requires_dual_auth(amount)
    }

    /// Whether moving `amount` calls for several signatures
    #[must_use]
    pub fn requires_multi_signature(&self, amount: i64) -> bool {
        self.config.requires_multi_signature(amount)
    }

    /// Transactions, newest first
    pub async fn get_transaction_history(
        &self,
        guild_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<BankTransaction>> {
        self.store.list_transactions(guild_id, limit).await
    }

    /// Per-member aggregates, recomputed from the log
    pub async fn get_member_contributions(
        &self,
        guild_id: Uuid,
    ) -> Result<HashMap<Uuid, MemberContribution>> {
        let log = self.store.list_transactions(guild_id, None).await?;
        Ok(MemberContribution::collect(&log))
    }

    /// Members ordered by net contribution, highest first
    pub async fn get_top_contributors(
        &self,
        guild_id: Uuid,
        limit: usize,
    ) -> Result<Vec<MemberContribution>> {
        let mut contributions: Vec<MemberContribution> = self
            .get_member_contributions(guild_id)
            .await?
            .into_values()
            .collect();
        contributions.sort_by(|a, b| {
            b.net_contribution()
                .cmp(&a.net_contribution())
                .then(a.player_id.cmp(&b.player_id))
        });
        contributions.truncate(limit);
        Ok(contributions)
    }

    /// Aggregate figures
    pub async fn get_bank_stats(&self, guild_id: Uuid) -> Result<BankStats> {
        let balance = self.current_balance(guild_id).await?;
        let log = self.store.list_transactions(guild_id, None).await?;
        Ok(BankStats::from_transactions(balance, &log))
    }

    /// Audit trail, newest first
    pub async fn get_audit_log(&self, guild_id: Uuid, limit: Option<usize>) -> Result<Vec<BankAudit>> {
        self.store.list_audits(guild_id, limit).await
    }

    /// Recompute the balance from the log and compare it with the cached
    /// value. Divergence is reported as an invariant error.
    pub async fn verify_balance(&self, guild_id: Uuid) -> Result<i64> {
        let _guard = self.locks.lock(guild_id).await;
        let cached = self.current_balance(guild_id).await?;
        let log = self.store.list_transactions(guild_id, None).await?;
        let recomputed: i64 = log.iter().map(BankTransaction::signed_amount).sum();
        if recomputed != cached {
            return Err(Error::Invariant(format!(
                "guild {} cached balance {} differs from ledger sum {} (checked at {})",
                guild_id,
                cached,
                recomputed,
                Utc::now()
            )));
        }
        Ok(cached)
    }
}
