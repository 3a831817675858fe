//! Bank - guild ledger and escrow
//!
//! Each guild has a spendable balance backed by an append-only transaction
//! log. The balance is always the signed sum of the log: deposits count
//! positive, withdrawals, fees and deductions count negative.
//!
//! Escrow holds are first-class records. A hold debits its guild when it is
//! opened and is settled exactly once, either by capture (credited to a
//! beneficiary) or by release (refunded to the origin).

mod ledger;

pub use ledger::BankLedger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Actor recorded on transactions the system makes on its own behalf
pub const SYSTEM_ACTOR: Uuid = Uuid::nil();

/// Kind of ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Funds added (member deposit, escrow capture or refund)
    Deposit,
    /// Funds taken out by a member
    Withdrawal,
    /// Withdrawal fee
    Fee,
    /// System debit (war upkeep, escrow hold)
    Deduction,
}

impl TransactionType {
    /// +1 for credits, -1 for debits
    #[must_use]
    pub fn sign(self) -> i64 {
        match self {
            TransactionType::Deposit => 1,
            TransactionType::Withdrawal | TransactionType::Fee | TransactionType::Deduction => -1,
        }
    }

    /// Stable storage name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Fee => "FEE",
            TransactionType::Deduction => "DEDUCTION",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(TransactionType::Deposit),
            "WITHDRAWAL" => Ok(TransactionType::Withdrawal),
            "FEE" => Ok(TransactionType::Fee),
            "DEDUCTION" => Ok(TransactionType::Deduction),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Unique transaction ID
    pub id: Uuid,
    /// Guild whose balance moved
    pub guild_id: Uuid,
    /// Player who caused the movement, or `SYSTEM_ACTOR`
    pub actor_id: Uuid,
    /// Movement kind
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Magnitude, always positive; the sign comes from `kind`
    pub amount: i64,
    /// Fee charged alongside a withdrawal
    pub fee: Option<i64>,
    /// Free-form note
    pub description: Option<String>,
    /// Time of the movement
    pub timestamp: DateTime<Utc>,
}

impl BankTransaction {
    /// Create a transaction stamped now
    pub fn new(guild_id: Uuid, actor_id: Uuid, kind: TransactionType, amount: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id,
            actor_id,
            kind,
            amount,
            fee: None,
            description: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a fee note
    pub fn with_fee(mut self, fee: i64) -> Self {
        self.fee = Some(fee);
        self
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Effect of this entry on the balance
    #[must_use]
    pub fn signed_amount(&self) -> i64 {
        self.kind.sign() * self.amount
    }
}

/// Settlement state of an escrow hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscrowStatus {
    /// Funds are held
    Held,
    /// Funds went to a beneficiary
    Captured,
    /// Funds went back to the origin
    Released,
}

impl EscrowStatus {
    /// Stable storage name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EscrowStatus::Held => "held",
            EscrowStatus::Captured => "captured",
            EscrowStatus::Released => "released",
        }
    }
}

impl FromStr for EscrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "held" => Ok(EscrowStatus::Held),
            "captured" => Ok(EscrowStatus::Captured),
            "released" => Ok(EscrowStatus::Released),
            other => Err(format!("unknown escrow status: {}", other)),
        }
    }
}

/// Funds set aside for a pending purpose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowHold {
    /// Unique hold ID
    pub id: Uuid,
    /// Guild the funds came from
    pub guild_id: Uuid,
    /// Player who authorized the hold
    pub actor_id: Uuid,
    /// Held amount
    pub amount: i64,
    /// What the funds are held for
    pub purpose: String,
    /// Settlement state
    pub status: EscrowStatus,
    /// Guild credited on settlement
    pub beneficiary_guild_id: Option<Uuid>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Settlement time
    pub resolved_at: Option<DateTime<Utc>>,
}

impl EscrowHold {
    /// Create an unsettled hold
    pub fn new(guild_id: Uuid, actor_id: Uuid, amount: i64, purpose: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id,
            actor_id,
            amount,
            purpose: purpose.into(),
            status: EscrowStatus::Held,
            beneficiary_guild_id: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Whether the hold still awaits settlement
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == EscrowStatus::Held
    }
}

/// Bank audit event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum AuditAction {
    Deposit,
    Withdrawal,
    PermissionDenied,
    InsufficientFunds,
    FeeCharged,
    FrozenRejected,
    EmergencyFreezeActivated,
    EmergencyFreezeDeactivated,
    EscrowHeld,
    EscrowCaptured,
    EscrowReleased,
}

impl AuditAction {
    /// Stable storage name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Deposit => "DEPOSIT",
            AuditAction::Withdrawal => "WITHDRAWAL",
            AuditAction::PermissionDenied => "PERMISSION_DENIED",
            AuditAction::InsufficientFunds => "INSUFFICIENT_FUNDS",
            AuditAction::FeeCharged => "FEE_CHARGED",
            AuditAction::FrozenRejected => "FROZEN_REJECTED",
            AuditAction::EmergencyFreezeActivated => "EMERGENCY_FREEZE_ACTIVATED",
            AuditAction::EmergencyFreezeDeactivated => "EMERGENCY_FREEZE_DEACTIVATED",
            AuditAction::EscrowHeld => "ESCROW_HELD",
            AuditAction::EscrowCaptured => "ESCROW_CAPTURED",
            AuditAction::EscrowReleased => "ESCROW_RELEASED",
        }
    }

    const ALL: [AuditAction; 11] = [
        AuditAction::Deposit,
        AuditAction::Withdrawal,
        AuditAction::PermissionDenied,
        AuditAction::InsufficientFunds,
        AuditAction::FeeCharged,
        AuditAction::FrozenRejected,
        AuditAction::EmergencyFreezeActivated,
        AuditAction::EmergencyFreezeDeactivated,
        AuditAction::EscrowHeld,
        AuditAction::EscrowCaptured,
        AuditAction::EscrowReleased,
    ];
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown audit action: {}", s))
    }
}

/// Audit trail entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAudit {
    /// Unique entry ID
    pub id: Uuid,
    /// Guild concerned
    pub guild_id: Uuid,
    /// Player concerned
    pub actor_id: Uuid,
    /// What happened
    pub action: AuditAction,
    /// Amount involved, if any
    pub amount: Option<i64>,
    /// Free-form note
    pub description: Option<String>,
    /// Event time
    pub timestamp: DateTime<Utc>,
}

impl BankAudit {
    /// Create an entry stamped now
    pub fn new(guild_id: Uuid, actor_id: Uuid, action: AuditAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            guild_id,
            actor_id,
            action,
            amount: None,
            description: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach an amount
    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// How a member's deposits compare to their withdrawals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStatus {
    /// Deposited more than withdrawn
    Contributor,
    /// Withdrew more than deposited
    Freeloader,
    /// Deposited exactly as much as withdrawn
    BreakEven,
    /// No deposits and no withdrawals
    Neutral,
}

/// A member's aggregate activity, derived from the transaction log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberContribution {
    /// Player ID
    pub player_id: Uuid,
    /// Sum of deposits
    pub total_deposits: i64,
    /// Sum of withdrawals, excluding fees
    pub total_withdrawals: i64,
    /// Deposits and withdrawals counted
    pub transaction_count: u32,
    /// Time of the latest counted transaction
    pub last_transaction: Option<DateTime<Utc>>,
}

impl MemberContribution {
    fn empty(player_id: Uuid) -> Self {
        Self {
            player_id,
            total_deposits: 0,
            total_withdrawals: 0,
            transaction_count: 0,
            last_transaction: None,
        }
    }

    /// Deposits minus withdrawals
    #[must_use]
    pub fn net_contribution(&self) -> i64 {
        self.total_deposits - self.total_withdrawals
    }

    /// Classification of this member
    #[must_use]
    pub fn status(&self) -> ContributionStatus {
        let net = self.net_contribution();
        if net > 0 {
            ContributionStatus::Contributor
        } else if net < 0 {
            ContributionStatus::Freeloader
        } else if self.total_deposits > 0 {
            ContributionStatus::BreakEven
        } else {
            ContributionStatus::Neutral
        }
    }

    /// Aggregate member deposits and withdrawals from a log.
    /// System entries, fees and deductions are not attributed to members.
    pub fn collect<'a>(
        transactions: impl IntoIterator<Item = &'a BankTransaction>,
    ) -> HashMap<Uuid, MemberContribution> {
        let mut out: HashMap<Uuid, MemberContribution> = HashMap::new();
        for tx in transactions {
            let is_member_movement = matches!(
                tx.kind,
                TransactionType::Deposit | TransactionType::Withdrawal
            );
            if tx.actor_id == SYSTEM_ACTOR || !is_member_movement {
                continue;
            }
            let entry = out
                .entry(tx.actor_id)
                .or_insert_with(|| MemberContribution::empty(tx.actor_id));
            if tx.kind == TransactionType::Deposit {
                entry.total_deposits += tx.amount;
            } else {
                entry.total_withdrawals += tx.amount;
            }
            entry.transaction_count += 1;
            if entry.last_transaction.map_or(true, |last| tx.timestamp > last) {
                entry.last_transaction = Some(tx.timestamp);
            }
        }
        out
    }
}

/// Aggregate view of a guild bank
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankStats {
    /// Current cached balance
    pub current_balance: i64,
    /// Number of ledger entries
    pub total_transactions: usize,
    /// Sum of all deposits, including escrow credits
    pub total_deposits: i64,
    /// Sum of withdrawals and their fees
    pub total_withdrawals: i64,
    /// Sum of fees alone
    pub total_fees: i64,
    /// Sum of system deductions, including escrow holds
    pub total_deductions: i64,
    /// Sum of all entry magnitudes
    pub transaction_volume: i64,
}

impl BankStats {
    /// Summarize a transaction log
    pub fn from_transactions<'a>(
        current_balance: i64,
        transactions: impl IntoIterator<Item = &'a BankTransaction>,
    ) -> Self {
        let mut stats = BankStats {
            current_balance,
            ..Default::default()
        };
        for tx in transactions {
            stats.total_transactions += 1;
            stats.transaction_volume += tx.amount;
            match tx.kind {
                TransactionType::Deposit => stats.total_deposits += tx.amount,
                TransactionType::Withdrawal => stats.total_withdrawals += tx.amount,
                TransactionType::Fee => {
                    stats.total_withdrawals += tx.amount;
                    stats.total_fees += tx.amount;
                }
                TransactionType::Deduction => stats.total_deductions += tx.amount,
            }
        }
        stats
    }
}
