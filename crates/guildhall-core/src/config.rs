//! Economy configuration
//!
//! Serde-friendly settings for every service. Each section can be omitted
//! from TOML; missing fields fall back to the defaults below.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::guild::GuildMode;

/// Longest span any day-based setting may express
pub const MAX_CONFIG_DAYS: i64 = 3_650;

fn check_days(field: &str, days: i64, min: i64) -> Result<()> {
    if !(min..=MAX_CONFIG_DAYS).contains(&days) {
        return Err(Error::Configuration(format!(
            "{} must be in [{}, {}] days, got {}",
            field, min, MAX_CONFIG_DAYS, days
        )));
    }
    Ok(())
}

fn check_hours(field: &str, hours: i64, min: i64) -> Result<()> {
    let max = MAX_CONFIG_DAYS * 24;
    if !(min..=max).contains(&hours) {
        return Err(Error::Configuration(format!(
            "{} must be in [{}, {}] hours, got {}",
            field, min, max, hours
        )));
    }
    Ok(())
}

/// All economy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Bank ledger settings
    #[serde(default)]
    pub bank: BankConfig,
    /// War engine settings
    #[serde(default)]
    pub war: WarConfig,
    /// Guild lifecycle settings
    #[serde(default)]
    pub guild: GuildConfig,
    /// Diplomacy settings
    #[serde(default)]
    pub diplomacy: DiplomacyConfig,
}

impl EconomyConfig {
    /// Reject settings that would make the services misbehave
    pub fn validate(&self) -> Result<()> {
        let bank = &self.bank;
        if bank.min_deposit < 1 || bank.max_deposit < bank.min_deposit {
            return Err(Error::Configuration(format!(
                "bank deposit bounds [{}, {}] are invalid",
                bank.min_deposit, bank.max_deposit
            )));
        }
        if !(0.0..1.0).contains(&bank.withdrawal_fee_percent) {
            return Err(Error::Configuration(format!(
                "bank.withdrawal_fee_percent must be in [0, 1), got {}",
                bank.withdrawal_fee_percent
            )));
        }
        if bank.max_withdrawal_fee < 0 {
            return Err(Error::Configuration(
                "bank.max_withdrawal_fee must not be negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&bank.max_withdrawal_percent) || bank.daily_withdrawal_limit < 1 {
            return Err(Error::Configuration(format!(
                "bank withdrawal limits ({}, {}) are invalid",
                bank.max_withdrawal_percent, bank.daily_withdrawal_limit
            )));
        }
        if bank.dual_auth_threshold < 0 || bank.multi_signature_count < 1 {
            return Err(Error::Configuration(format!(
                "bank security thresholds ({}, {}) are invalid",
                bank.dual_auth_threshold, bank.multi_signature_count
            )));
        }
        if self.war.max_active_wars == 0 {
            return Err(Error::Configuration(
                "war.max_active_wars must be at least 1".to_string(),
            ));
        }
        if self.war.default_kill_target == 0 {
            return Err(Error::Configuration(
                "war.default_kill_target must be at least 1".to_string(),
            ));
        }
        if self.war.daily_war_cost < 0 {
            return Err(Error::Configuration(
                "war.daily_war_cost must not be negative".to_string(),
            ));
        }
        if self.war.max_objectives == 0 {
            return Err(Error::Configuration(
                "war.max_objectives must be at least 1".to_string(),
            ));
        }
        let war = &self.war;
        check_days("war.max_duration_days", war.max_duration_days, 1)?;
        check_days("war.default_duration_days", war.default_duration_days, 1)?;
        if war.default_duration_days > war.max_duration_days {
            return Err(Error::Configuration(format!(
                "war.default_duration_days ({}) exceeds war.max_duration_days ({})",
                war.default_duration_days, war.max_duration_days
            )));
        }
        check_hours("war.declaration_expiry_hours", war.declaration_expiry_hours, 1)?;
        check_hours("war.farming_cooldown_hours", war.farming_cooldown_hours, 0)?;
        check_hours("war.peace_proposal_expiry_hours", war.peace_proposal_expiry_hours, 1)?;
        check_days(
            "guild.mode_switch_cooldown_days",
            self.guild.mode_switch_cooldown_days,
            0,
        )?;
        check_days(
            "diplomacy.request_expiry_days",
            self.diplomacy.request_expiry_days,
            1,
        )?;
        Ok(())
    }
}

/// Bank ledger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankConfig {
    /// Smallest accepted deposit
    #[serde(default = "default_min_deposit")]
    pub min_deposit: i64,
    /// Largest accepted single deposit
    #[serde(default = "default_max_deposit")]
    pub max_deposit: i64,
    /// Fraction of a withdrawal charged as a fee
    #[serde(default = "default_withdrawal_fee_percent")]
    pub withdrawal_fee_percent: f64,
    /// Upper bound on a single withdrawal fee
    #[serde(default = "default_max_withdrawal_fee")]
    pub max_withdrawal_fee: i64,
    /// Share of the balance suggested as the most a member takes at once
    #[serde(default = "default_max_withdrawal_percent")]
    pub max_withdrawal_percent: f64,
    /// Ceiling on the suggested withdrawal amount
    #[serde(default = "default_daily_withdrawal_limit")]
    pub daily_withdrawal_limit: i64,
    /// Amount from which a movement calls for a second officer
    #[serde(default = "default_dual_auth_threshold")]
    pub dual_auth_threshold: i64,
    /// Whether large movements also call for several signatures
    #[serde(default)]
    pub multi_signature_required: bool,
    /// Signatures needed when multi-signature applies
    #[serde(default = "default_multi_signature_count")]
    pub multi_signature_count: u32,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            min_deposit: default_min_deposit(),
            max_deposit: default_max_deposit(),
            withdrawal_fee_percent: default_withdrawal_fee_percent(),
            max_withdrawal_fee: default_max_withdrawal_fee(),
            max_withdrawal_percent: default_max_withdrawal_percent(),
            daily_withdrawal_limit: default_daily_withdrawal_limit(),
            dual_auth_threshold: default_dual_auth_threshold(),
            multi_signature_required: false,
            multi_signature_count: default_multi_signature_count(),
        }
    }
}

impl BankConfig {
    /// Settings without withdrawal fees
    pub fn without_fees(mut self) -> Self {
        self.withdrawal_fee_percent = 0.0;
        self
    }

    /// Fee charged for withdrawing `amount`
    #[must_use]
    pub fn withdrawal_fee(&self, amount: i64) -> i64 {
        let fee = (amount as f64 * self.withdrawal_fee_percent).floor() as i64;
        fee.clamp(0, self.max_withdrawal_fee)
    }

    /// Largest amount whose withdrawal, fee included, `balance` covers
    #[must_use]
    pub fn max_affordable_withdrawal(&self, balance: i64) -> i64 {
        if balance <= 0 {
            return 0;
        }
        let fits = |amount: i64| {
            amount
                .checked_add(self.withdrawal_fee(amount))
                .is_some_and(|total| total <= balance)
        };

        // Once the fee reaches its cap, every larger amount pays the cap too.
        let capped = balance - self.max_withdrawal_fee;
        if capped > 0 && self.withdrawal_fee(capped) == self.max_withdrawal_fee {
            return capped;
        }

        let mut amount = ((balance as f64) / (1.0 + self.withdrawal_fee_percent)).floor() as i64;
        amount = amount.clamp(0, balance);
        while amount > 0 && !fits(amount) {
            amount -= 1;
        }
        while amount < balance && fits(amount + 1) {
            amount += 1;
        }
        amount
    }

    /// Whether moving `amount` calls for a second officer
    #[must_use]
    pub fn requires_dual_auth(&self, amount: i64) -> bool {
        amount >= self.dual_auth_threshold
    }

    /// Whether moving `amount` calls for several signatures
    #[must_use]
    pub fn requires_multi_signature(&self, amount: i64) -> bool {
        self.multi_signature_required && amount >= self.dual_auth_threshold
    }
}

fn default_min_deposit() -> i64 {
    1
}
fn default_max_deposit() -> i64 {
    100_000
}
fn default_withdrawal_fee_percent() -> f64 {
    0.02
}
fn default_max_withdrawal_fee() -> i64 {
    2_000
}
fn default_max_withdrawal_percent() -> f64 {
    0.5
}
fn default_daily_withdrawal_limit() -> i64 {
    50_000
}
fn default_dual_auth_threshold() -> i64 {
    1_000
}
fn default_multi_signature_count() -> u32 {
    2
}

/// War engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarConfig {
    /// Duration used when a declaration does not specify one
    #[serde(default = "default_war_duration_days")]
    pub default_duration_days: i64,
    /// Longest war a declaration may ask for
    #[serde(default = "default_max_war_duration_days")]
    pub max_duration_days: i64,
    /// Objectives a single declaration may carry
    #[serde(default = "default_max_objectives")]
    pub max_objectives: usize,
    /// How long a peace proposal stays open
    #[serde(default = "default_peace_proposal_expiry_hours")]
    pub peace_proposal_expiry_hours: i64,
    /// How long a pending declaration waits for the defender
    #[serde(default = "default_declaration_expiry_hours")]
    pub declaration_expiry_hours: i64,
    /// Open (pending or active) wars a guild may be part of at once
    #[serde(default = "default_max_active_wars")]
    pub max_active_wars: usize,
    /// Kill target used when a declaration carries no objectives
    #[serde(default = "default_kill_target")]
    pub default_kill_target: u32,
    /// Upkeep charged to each side of an active war once per day
    #[serde(default = "default_daily_war_cost")]
    pub daily_war_cost: i64,
    /// Hours a winner is flagged after a decisive war
    #[serde(default = "default_farming_cooldown_hours")]
    pub farming_cooldown_hours: i64,
    /// Finished wars returned alongside open ones by `wars_for_guild`
    #[serde(default = "default_recent_history_limit")]
    pub recent_history_limit: usize,
}

impl Default for WarConfig {
    fn default() -> Self {
        Self {
            default_duration_days: default_war_duration_days(),
            max_duration_days: default_max_war_duration_days(),
            max_objectives: default_max_objectives(),
            peace_proposal_expiry_hours: default_peace_proposal_expiry_hours(),
            declaration_expiry_hours: default_declaration_expiry_hours(),
            max_active_wars: default_max_active_wars(),
            default_kill_target: default_kill_target(),
            daily_war_cost: default_daily_war_cost(),
            farming_cooldown_hours: default_farming_cooldown_hours(),
            recent_history_limit: default_recent_history_limit(),
        }
    }
}

impl WarConfig {
    /// Default war duration
    #[must_use]
    pub fn default_duration(&self) -> Duration {
        Duration::days(self.default_duration_days)
    }

    /// Longest accepted war duration
    #[must_use]
    pub fn max_duration(&self) -> Duration {
        Duration::days(self.max_duration_days)
    }

    /// Lifetime of a peace proposal
    #[must_use]
    pub fn peace_proposal_expiry(&self) -> Duration {
        Duration::hours(self.peace_proposal_expiry_hours)
    }

    /// Acceptance window for pending declarations
    #[must_use]
    pub fn declaration_expiry(&self) -> Duration {
        Duration::hours(self.declaration_expiry_hours)
    }

    /// Winner cooldown after a decisive war
    #[must_use]
    pub fn farming_cooldown(&self) -> Duration {
        Duration::hours(self.farming_cooldown_hours)
    }
}

fn default_war_duration_days() -> i64 {
    7
}
fn default_max_war_duration_days() -> i64 {
    30
}
fn default_max_objectives() -> usize {
    5
}
fn default_peace_proposal_expiry_hours() -> i64 {
    24
}
fn default_declaration_expiry_hours() -> i64 {
    24
}
fn default_max_active_wars() -> usize {
    3
}
fn default_kill_target() -> u32 {
    10
}
fn default_daily_war_cost() -> i64 {
    100
}
fn default_farming_cooldown_hours() -> i64 {
    24
}
fn default_recent_history_limit() -> usize {
    10
}

/// Guild lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildConfig {
    /// Mode assigned to newly formed guilds
    #[serde(default = "default_mode")]
    pub default_mode: GuildMode,
    /// Days between mode switches
    #[serde(default = "default_mode_switch_cooldown_days")]
    pub mode_switch_cooldown_days: i64,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            default_mode: default_mode(),
            mode_switch_cooldown_days: default_mode_switch_cooldown_days(),
        }
    }
}

impl GuildConfig {
    /// Minimum time between mode switches
    #[must_use]
    pub fn mode_switch_cooldown(&self) -> Duration {
        Duration::days(self.mode_switch_cooldown_days)
    }
}

fn default_mode() -> GuildMode {
    GuildMode::Hostile
}
fn default_mode_switch_cooldown_days() -> i64 {
    7
}

/// Diplomacy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiplomacyConfig {
    /// Days before an unanswered request lapses
    #[serde(default = "default_request_expiry_days")]
    pub request_expiry_days: i64,
}

impl Default for DiplomacyConfig {
    fn default() -> Self {
        Self {
            request_expiry_days: default_request_expiry_days(),
        }
    }
}

impl DiplomacyConfig {
    /// Lifetime of a request
    #[must_use]
    pub fn request_expiry(&self) -> Duration {
        Duration::days(self.request_expiry_days)
    }
}

fn default_request_expiry_days() -> i64 {
    7
}

/// Sweeper loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between sweeps
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Whether to charge daily war upkeep
    #[serde(default = "default_true")]
    pub daily_upkeep_enabled: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            daily_upkeep_enabled: true,
        }
    }
}

impl SweeperConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set check interval
    pub fn with_check_interval(mut self, secs: u64) -> Self {
        self.check_interval_secs = secs;
        self
    }

    /// Enable or disable daily upkeep
    pub fn with_daily_upkeep(mut self, enabled: bool) -> Self {
        self.daily_upkeep_enabled = enabled;
        self
    }
}

fn default_check_interval_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
