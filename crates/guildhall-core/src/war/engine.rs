//! War engine
//!
//! Drives wars through their lifecycle and settles wagers through the bank
//! ledger. Every transition runs under the locks of both guilds and
//! re-reads the war after locking, so a kill event and a scheduled sweep
//! racing on the same war settle it once.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    PeaceProposal, PeaceStatus, War, WarObjective, WarStatus, MAX_PEACE_TERMS_LEN,
};
use crate::bank::BankLedger;
use crate::config::WarConfig;
use crate::error::{Error, Result};
use crate::guild::GuildMode;
use crate::locks::GuildLocks;
use crate::ranks::{RankAuthority, RankPermission};
use crate::store::{GuildStore, WarStore};

/// War lifecycle service
pub struct WarEngine {
    wars: Arc<dyn WarStore>,
    guilds: Arc<dyn GuildStore>,
    ranks: Arc<RankAuthority>,
    ledger: Arc<BankLedger>,
    locks: Arc<GuildLocks>,
    config: WarConfig,
    farming_cooldowns: DashMap<Uuid, DateTime<Utc>>,
}

impl WarEngine {
    /// Create a war engine
    pub fn new(
        wars: Arc<dyn WarStore>,
        guilds: Arc<dyn GuildStore>,
        ranks: Arc<RankAuthority>,
        ledger: Arc<BankLedger>,
        locks: Arc<GuildLocks>,
        config: WarConfig,
    ) -> Self {
        Self {
            wars,
            guilds,
            ranks,
            ledger,
            locks,
            config,
            farming_cooldowns: DashMap::new(),
        }
    }

    /// Active settings
    #[must_use]
    pub fn config(&self) -> &WarConfig {
        &self.config
    }

    async fn can_act(&self, actor_id: Uuid, guild_id: Uuid) -> Result<bool> {
        self.ranks
            .has_permission(actor_id, guild_id, RankPermission::DeclareWar)
            .await
    }

    async fn persist(&self, war: &War) -> Result<()> {
        if !self.wars.update_war(war).await? {
            return Err(Error::WarNotFound(war.id));
        }
        Ok(())
    }

    async fn release_after_failure(&self, hold_id: Uuid) {
        if let Err(e) = self.ledger.release_escrow(hold_id).await {
            error!(hold = %hold_id, "Failed to release escrow after aborted war operation: {}", e);
        }
    }

    async fn release_holds(&self, war: &War) -> Result<()> {
        let holds: Vec<Uuid> = war.holds().collect();
        for hold in holds {
            self.ledger.release_escrow(hold).await?;
        }
        Ok(())
    }

    // ── Declaration ────────────────────────────────────────────────────

    /// Declare war. With a wager, the declaring guild's stake is held in
    /// escrow first; if that fails no war is created.
    ///
    /// Returns `None` when the actor lacks `DECLARE_WAR`, the guilds are
    /// already at war, the declaring guild has no capacity left, or the
    /// stake cannot be held.
    pub async fn declare_war(
        &self,
        declaring_guild_id: Uuid,
        defending_guild_id: Uuid,
        duration: Duration,
        objectives: Vec<WarObjective>,
        wager: i64,
        actor_id: Uuid,
    ) -> Result<Option<War>> {
        if wager < 0 {
            return Err(Error::InvalidAmount(wager));
        }
        if duration <= Duration::zero() {
            return Err(Error::Invariant(format!(
                "war duration must be positive, got {}s",
                duration.num_seconds()
            )));
        }
        if duration > self.config.max_duration() {
            return Err(Error::Invariant(format!(
                "war duration of {}s exceeds the {} day limit",
                duration.num_seconds(),
                self.config.max_duration_days
            )));
        }
        if objectives.len() > self.config.max_objectives {
            return Err(Error::Invariant(format!(
                "a war carries at most {} objectives, got {}",
                self.config.max_objectives,
                objectives.len()
            )));
        }
        if objectives.iter().any(|o| o.target_value == 0) {
            return Err(Error::Invariant("war objective target must be positive".to_string()));
        }
        if declaring_guild_id == defending_guild_id {
            warn!(guild = %declaring_guild_id, "A guild cannot declare war on itself");
            return Ok(None);
        }

        let _guard = self
            .locks
            .lock_pair(declaring_guild_id, defending_guild_id)
            .await;

        if !self.can_act(actor_id, declaring_guild_id).await? {
            warn!(guild = %declaring_guild_id, actor = %actor_id, "War declaration denied: missing DECLARE_WAR");
            return Ok(None);
        }
        let Some(defender) = self.guilds.get_guild(defending_guild_id).await? else {
            return Ok(None);
        };
        if self
            .wars
            .find_open_war_between(declaring_guild_id, defending_guild_id)
            .await?
            .is_some()
        {
            warn!(
                declaring = %declaring_guild_id,
                defending = %defending_guild_id,
                "Guilds are already at war"
            );
            return Ok(None);
        }
        if !self.can_guild_declare_war(declaring_guild_id).await? {
            warn!(guild = %declaring_guild_id, "Too many open wars");
            return Ok(None);
        }

        let objectives = if objectives.is_empty() {
            vec![WarObjective::kills(self.config.default_kill_target)]
        } else {
            objectives
        };
        let now = Utc::now();
        let mut war = War::declare(
            declaring_guild_id,
            defending_guild_id,
            duration,
            objectives,
            wager,
            now + self.config.declaration_expiry(),
        );

        if wager > 0 {
            let purpose = format!("war wager vs. {}", defender.name);
            let Some(hold) = self
                .ledger
                .hold_escrow(declaring_guild_id, actor_id, wager, &purpose)
                .await?
            else {
                warn!(guild = %declaring_guild_id, wager, "War declaration failed: wager could not be held");
                return Ok(None);
            };
            war.declaring_hold_id = Some(hold.id);
        }

        if defender.mode == GuildMode::Hostile && wager == 0 {
            war.start(now)?;
        }

        if let Err(e) = self.wars.insert_war(&war).await {
            if let Some(hold) = war.declaring_hold_id {
                self.release_after_failure(hold).await;
            }
            return Err(e);
        }

        info!(
            war = %war.id,
            declaring = %declaring_guild_id,
            defending = %defending_guild_id,
            wager,
            status = %war.status,
            "War declared"
        );
        Ok(Some(war))
    }

    /// Accept a pending declaration on behalf of the defending guild,
    /// matching the wager if there is one.
    pub async fn accept_war(&self, war_id: Uuid, actor_id: Uuid) -> Result<Option<War>> {
        let Some(war) = self.wars.get_war(war_id).await? else {
            return Ok(None);
        };
        let _guard = self
            .locks
            .lock_pair(war.declaring_guild_id, war.defending_guild_id)
            .await;
        let Some(mut war) = self.wars.get_war(war_id).await? else {
            return Ok(None);
        };

        if war.status != WarStatus::PendingAcceptance {
            debug!(war = %war_id, status = %war.status, "War is not awaiting acceptance");
            return Ok(None);
        }
        let now = Utc::now();
        if war.acceptance_deadline.is_some_and(|d| now >= d) {
            self.expire_pending(&mut war, now).await?;
            return Ok(None);
        }
        if !self.can_act(actor_id, war.defending_guild_id).await? {
            warn!(war = %war_id, actor = %actor_id, "War acceptance denied");
            return Ok(None);
        }

        if war.wager > 0 {
            let purpose = format!("war wager for war {}", war.id);
            let Some(hold) = self
                .ledger
                .hold_escrow(war.defending_guild_id, actor_id, war.wager, &purpose)
                .await?
            else {
                warn!(war = %war_id, wager = war.wager, "War acceptance failed: wager could not be matched");
                return Ok(None);
            };
            war.defending_hold_id = Some(hold.id);
        }

        let started = war.start(now);
        if let Err(e) = started {
            if let Some(hold) = war.defending_hold_id {
                self.release_after_failure(hold).await;
            }
            return Err(e);
        }
        if let Err(e) = self.persist(&war).await {
            if let Some(hold) = war.defending_hold_id {
                self.release_after_failure(hold).await;
            }
            return Err(e);
        }

        info!(war = %war_id, expires_at = ?war.expires_at, "War accepted");
        Ok(Some(war))
    }

    /// Reject (defender) or withdraw (declarer) a pending declaration.
    /// Any held wager is refunded.
    pub async fn reject_war(&self, war_id: Uuid, actor_id: Uuid) -> Result<bool> {
        let Some(war) = self.wars.get_war(war_id).await? else {
            return Ok(false);
        };
        let _guard = self
            .locks
            .lock_pair(war.declaring_guild_id, war.defending_guild_id)
            .await;
        let Some(mut war) = self.wars.get_war(war_id).await? else {
            return Ok(false);
        };
        if war.status != WarStatus::PendingAcceptance {
            return Ok(false);
        }

        let reason = if self.can_act(actor_id, war.defending_guild_id).await? {
            "rejected by defender"
        } else if self.can_act(actor_id, war.declaring_guild_id).await? {
            "cancelled by declarer"
        } else {
            warn!(war = %war_id, actor = %actor_id, "War rejection denied");
            return Ok(false);
        };

        self.release_holds(&war).await?;
        war.finish(WarStatus::Cancelled, None, reason, Utc::now());
        self.persist(&war).await?;

        info!(war = %war_id, reason, "War cancelled");
        Ok(true)
    }

    // ── Peace ──────────────────────────────────────────────────────────

    /// Offer the other side of an active war a peace on `terms`.
    ///
    /// Returns `None` when the war is not running, the guild is not a party,
    /// the actor lacks `DECLARE_WAR`, the terms are empty or too long, or
    /// the guild already has an open proposal in this war.
    pub async fn propose_peace(
        &self,
        war_id: Uuid,
        proposing_guild_id: Uuid,
        terms: &str,
        actor_id: Uuid,
    ) -> Result<Option<PeaceProposal>> {
        let terms = terms.trim();
        if terms.is_empty() || terms.chars().count() > MAX_PEACE_TERMS_LEN {
            debug!(war = %war_id, "Peace terms rejected");
            return Ok(None);
        }
        let Some(war) = self.wars.get_war(war_id).await? else {
            return Ok(None);
        };
        let now = Utc::now();
        if !war.is_active() || war.expires_at.is_some_and(|e| now >= e) {
            warn!(war = %war_id, status = %war.status, "Peace can only be proposed in an active war");
            return Ok(None);
        }
        let Some(target_guild_id) = war.opponent_of(proposing_guild_id) else {
            return Ok(None);
        };
        if !self.can_act(actor_id, proposing_guild_id).await? {
            warn!(war = %war_id, actor = %actor_id, "Peace proposal denied");
            return Ok(None);
        }
        let duplicate = self
            .wars
            .list_peace_proposals_for_war(war_id)
            .await?
            .iter()
            .any(|p| p.proposing_guild_id == proposing_guild_id && p.is_open_at(now));
        if duplicate {
            debug!(war = %war_id, guild = %proposing_guild_id, "Peace proposal already open");
            return Ok(None);
        }

        let proposal = PeaceProposal::new(
            war_id,
            proposing_guild_id,
            target_guild_id,
            terms,
            now,
            now + self.config.peace_proposal_expiry(),
        );
        self.wars.insert_peace_proposal(&proposal).await?;

        info!(
            war = %war_id,
            proposal = %proposal.id,
            proposing = %proposing_guild_id,
            target = %target_guild_id,
            "Peace proposed"
        );
        Ok(Some(proposal))
    }

    async fn open_proposal_for(
        &self,
        proposal_id: Uuid,
        guild_id: Uuid,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<PeaceProposal>> {
        let Some(proposal) = self.wars.get_peace_proposal(proposal_id).await? else {
            return Ok(None);
        };
        if !proposal.is_open_at(now) || proposal.target_guild_id != guild_id {
            warn!(proposal = %proposal_id, guild = %guild_id, "Peace proposal cannot be answered");
            return Ok(None);
        }
        if !self.can_act(actor_id, guild_id).await? {
            warn!(proposal = %proposal_id, actor = %actor_id, "Peace answer denied");
            return Ok(None);
        }
        Ok(Some(proposal))
    }

    /// Accept a peace proposal addressed to `accepting_guild_id`. The war
    /// ends as a draw and every stake is refunded. Returns the ended war.
    pub async fn accept_peace(
        &self,
        proposal_id: Uuid,
        accepting_guild_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Option<War>> {
        let Some(proposal) = self.wars.get_peace_proposal(proposal_id).await? else {
            return Ok(None);
        };
        let Some(war) = self.wars.get_war(proposal.war_id).await? else {
            return Ok(None);
        };
        let _guard = self
            .locks
            .lock_pair(war.declaring_guild_id, war.defending_guild_id)
            .await;

        let now = Utc::now();
        let Some(mut proposal) = self
            .open_proposal_for(proposal_id, accepting_guild_id, actor_id, now)
            .await?
        else {
            return Ok(None);
        };
        let Some(mut war) = self.wars.get_war(proposal.war_id).await? else {
            return Ok(None);
        };
        if !war.is_active() || war.expires_at.is_some_and(|e| now >= e) {
            warn!(war = %war.id, status = %war.status, "Peace accepted for a war that is no longer running");
            return Ok(None);
        }

        self.release_holds(&war).await?;
        war.finish(WarStatus::Resolved, None, "peace agreement", now);
        self.persist(&war).await?;

        proposal.answer(PeaceStatus::Accepted, now);
        if !self.wars.update_peace_proposal(&proposal).await? {
            error!(proposal = %proposal_id, "Peace proposal vanished after the war ended");
        }

        info!(war = %war.id, proposal = %proposal_id, "War ended by peace agreement");
        Ok(Some(war))
    }

    /// Turn down a peace proposal addressed to `rejecting_guild_id`.
    pub async fn reject_peace(
        &self,
        proposal_id: Uuid,
        rejecting_guild_id: Uuid,
        actor_id: Uuid,
    ) -> Result<bool> {
        let now = Utc::now();
        let Some(mut proposal) = self
            .open_proposal_for(proposal_id, rejecting_guild_id, actor_id, now)
            .await?
        else {
            return Ok(false);
        };
        proposal.answer(PeaceStatus::Rejected, now);
        let updated = self.wars.update_peace_proposal(&proposal).await?;
        if updated {
            info!(proposal = %proposal_id, guild = %rejecting_guild_id, "Peace proposal rejected");
        }
        Ok(updated)
    }

    // ── Resolution ─────────────────────────────────────────────────────

    /// End an active war in favour of `winning_guild_id`, capturing every
    /// stake for the winner. Returns `false` if the war already ended.
    pub async fn resolve_by_objective(&self, war_id: Uuid, winning_guild_id: Uuid) -> Result<bool> {
        self.conclude(war_id, winning_guild_id, "objective reached")
            .await
    }

    /// Concede an active war; the other side wins.
    pub async fn surrender(&self, war_id: Uuid, guild_id: Uuid, actor_id: Uuid) -> Result<bool> {
        let Some(war) = self.wars.get_war(war_id).await? else {
            return Ok(false);
        };
        let Some(winner) = war.opponent_of(guild_id) else {
            return Ok(false);
        };
        if !self.can_act(actor_id, guild_id).await? {
            warn!(war = %war_id, actor = %actor_id, "Surrender denied");
            return Ok(false);
        }
        self.conclude(war_id, winner, "surrender").await
    }

    async fn conclude(&self, war_id: Uuid, winner: Uuid, reason: &str) -> Result<bool> {
        let war = self
            .wars
            .get_war(war_id)
            .await?
            .ok_or(Error::WarNotFound(war_id))?;
        if !war.involves(winner) {
            return Err(Error::Invariant(format!(
                "guild {} is not a party to war {}",
                winner, war_id
            )));
        }

        let _guard = self
            .locks
            .lock_pair(war.declaring_guild_id, war.defending_guild_id)
            .await;
        let mut war = self
            .wars
            .get_war(war_id)
            .await?
            .ok_or(Error::WarNotFound(war_id))?;

        if war.status.is_terminal() {
            debug!(war = %war_id, status = %war.status, "War already concluded");
            return Ok(false);
        }
        if !war.is_active() {
            warn!(war = %war_id, "Cannot resolve a war that has not started");
            return Ok(false);
        }

        let holds: Vec<Uuid> = war.holds().collect();
        for hold in holds {
            self.ledger.capture_escrow(hold, winner).await?;
        }

        let now = Utc::now();
        war.finish(WarStatus::Resolved, Some(winner), reason, now);
        self.persist(&war).await?;
        self.farming_cooldowns
            .insert(winner, now + self.config.farming_cooldown());

        info!(
            war = %war_id,
            winner = %winner,
            loser = ?war.loser(),
            pot = war.wager * war.holds().count() as i64,
            reason,
            "War resolved"
        );
        Ok(true)
    }

    /// Expire the war if its deadline has passed. See `expire_if_overdue_at`.
    pub async fn expire_if_overdue(&self, war_id: Uuid) -> Result<bool> {
        self.expire_if_overdue_at(war_id, Utc::now()).await
    }

    /// An active war past `expires_at` ends as a draw with both stakes
    /// refunded; a pending declaration past its deadline expires with the
    /// declarer's stake refunded. Returns `false` if nothing changed.
    pub async fn expire_if_overdue_at(&self, war_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let war = self
            .wars
            .get_war(war_id)
            .await?
            .ok_or(Error::WarNotFound(war_id))?;
        let _guard = self
            .locks
            .lock_pair(war.declaring_guild_id, war.defending_guild_id)
            .await;
        let mut war = self
            .wars
            .get_war(war_id)
            .await?
            .ok_or(Error::WarNotFound(war_id))?;

        match war.status {
            WarStatus::Active if war.expires_at.is_some_and(|e| now >= e) => {
                self.release_holds(&war).await?;
                war.finish(WarStatus::Resolved, None, "duration elapsed", now);
                self.persist(&war).await?;
                info!(war = %war_id, "War ended in a draw");
                Ok(true)
            }
            WarStatus::PendingAcceptance if war.acceptance_deadline.is_some_and(|d| now >= d) => {
                self.expire_pending(&mut war, now).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_pending(&self, war: &mut War, now: DateTime<Utc>) -> Result<()> {
        self.release_holds(war).await?;
        war.finish(WarStatus::Expired, None, "acceptance deadline passed", now);
        self.persist(war).await?;
        info!(war = %war.id, "War declaration expired");
        Ok(())
    }

    // ── Combat ─────────────────────────────────────────────────────────

    /// Count a kill between members of two guilds at war. Resolves the war
    /// when the killer's side reaches a kill objective. Returns the war as
    /// it stands afterwards, or `None` if the kill does not count.
    pub async fn record_kill(&self, killer_id: Uuid, victim_id: Uuid) -> Result<Option<War>> {
        let Some(killer) = self.ranks.get_membership(killer_id).await? else {
            return Ok(None);
        };
        let Some(victim) = self.ranks.get_membership(victim_id).await? else {
            return Ok(None);
        };
        if killer.guild_id == victim.guild_id {
            return Ok(None);
        }
        let Some(war) = self
            .wars
            .find_open_war_between(killer.guild_id, victim.guild_id)
            .await?
        else {
            return Ok(None);
        };

        let winner = {
            let _guard = self
                .locks
                .lock_pair(war.declaring_guild_id, war.defending_guild_id)
                .await;
            let Some(mut war) = self.wars.get_war(war.id).await? else {
                return Ok(None);
            };
            let now = Utc::now();
            if !war.is_active() || war.expires_at.is_some_and(|e| now >= e) {
                return Ok(None);
            }
            if killer.guild_id == war.declaring_guild_id {
                war.stats.declaring_kills += 1;
            } else {
                war.stats.defending_kills += 1;
            }
            self.persist(&war).await?;
            debug!(
                war = %war.id,
                declaring_kills = war.stats.declaring_kills,
                defending_kills = war.stats.defending_kills,
                "Kill recorded"
            );
            war.objective_winner()
        };

        if let Some(winner) = winner {
            self.resolve_by_objective(war.id, winner).await?;
        }
        self.wars.get_war(war.id).await
    }

    // ── Maintenance ────────────────────────────────────────────────────

    /// Expire every overdue war and declaration. Returns how many changed.
    pub async fn process_overdue_wars(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut expired = 0;
        for war in self.wars.list_open_wars().await? {
            match self.expire_if_overdue_at(war.id, now).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => error!(war = %war.id, "Failed to expire war: {}", e),
            }
        }
        Ok(expired)
    }

    /// Charge daily upkeep to both sides of every active war that has gone
    /// a full day without a charge. A guild that cannot pay is skipped for
    /// that day. Returns the number of wars charged.
    pub async fn apply_daily_upkeep(&self, now: DateTime<Utc>) -> Result<usize> {
        let cost = self.config.daily_war_cost;
        if cost <= 0 {
            return Ok(0);
        }

        let mut charged = 0;
        for war in self.wars.list_open_wars().await? {
            if !war.is_active() {
                continue;
            }
            let _guard = self
                .locks
                .lock_pair(war.declaring_guild_id, war.defending_guild_id)
                .await;
            let Some(mut war) = self.wars.get_war(war.id).await? else {
                continue;
            };
            let due = war
                .last_upkeep_at
                .or(war.started_at)
                .is_some_and(|since| now - since >= Duration::days(1));
            if !war.is_active() || !due {
                continue;
            }

            for guild_id in [war.declaring_guild_id, war.defending_guild_id] {
                let reason = format!("Daily upkeep for war {}", war.id);
                if self.ledger.deduct(guild_id, cost, &reason).await?.is_none() {
                    warn!(guild = %guild_id, war = %war.id, cost, "Guild could not pay war upkeep");
                }
            }
            war.last_upkeep_at = Some(now);
            self.persist(&war).await?;
            charged += 1;
        }
        Ok(charged)
    }

    /// End every open war of a guild that is being disbanded, refunding all
    /// stakes. Returns how many wars were ended.
    pub async fn end_all_for_guild(&self, guild_id: Uuid) -> Result<usize> {
        let mut ended = 0;
        for war in self.wars.list_wars_for_guild(guild_id).await? {
            if war.status.is_terminal() {
                continue;
            }
            let _guard = self
                .locks
                .lock_pair(war.declaring_guild_id, war.defending_guild_id)
                .await;
            let Some(mut war) = self.wars.get_war(war.id).await? else {
                continue;
            };
            let status = match war.status {
                WarStatus::PendingAcceptance => WarStatus::Cancelled,
                WarStatus::Active => WarStatus::Resolved,
                _ => continue,
            };
            self.release_holds(&war).await?;
            war.finish(status, None, "guild disbanded", Utc::now());
            self.persist(&war).await?;
            ended += 1;
        }
        if ended > 0 {
            info!(guild = %guild_id, ended, "Wars ended by disbandment");
        }
        Ok(ended)
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// A war by ID
    pub async fn get_war(&self, war_id: Uuid) -> Result<Option<War>> {
        self.wars.get_war(war_id).await
    }

    /// The pending or active war between two guilds
    pub async fn get_current_war_between_guilds(&self, a: Uuid, b: Uuid) -> Result<Option<War>> {
        self.wars.find_open_war_between(a, b).await
    }

    /// Open wars of a guild followed by its most recent finished ones
    pub async fn get_wars_for_guild(&self, guild_id: Uuid) -> Result<Vec<War>> {
        let wars = self.wars.list_wars_for_guild(guild_id).await?;
        let (open, finished): (Vec<War>, Vec<War>) =
            wars.into_iter().partition(|w| w.status.is_open());
        Ok(open
            .into_iter()
            .chain(finished.into_iter().take(self.config.recent_history_limit))
            .collect())
    }

    /// Finished wars of a guild, most recent first
    pub async fn get_war_history(&self, guild_id: Uuid, limit: Option<usize>) -> Result<Vec<War>> {
        let mut finished: Vec<War> = self
            .wars
            .list_wars_for_guild(guild_id)
            .await?
            .into_iter()
            .filter(|w| w.status.is_terminal())
            .collect();
        finished.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
        if let Some(limit) = limit {
            finished.truncate(limit);
        }
        Ok(finished)
    }

    /// Wins divided by losses. With no losses: `f64::MAX` if the guild has
    /// won at least once, otherwise 0.
    pub async fn get_win_loss_ratio(&self, guild_id: Uuid) -> Result<f64> {
        let wars = self.wars.list_wars_for_guild(guild_id).await?;
        let decided = wars
            .iter()
            .filter(|w| w.status == WarStatus::Resolved)
            .filter_map(|w| w.winner);
        let (wins, losses) = decided.fold((0u32, 0u32), |(w, l), winner| {
            if winner == guild_id {
                (w + 1, l)
            } else {
                (w, l + 1)
            }
        });
        Ok(match (wins, losses) {
            (0, 0) => 0.0,
            (_, 0) => f64::MAX,
            (w, l) => f64::from(w) / f64::from(l),
        })
    }

    /// Every peace proposal made in a war, oldest first
    pub async fn get_peace_proposals_for_war(&self, war_id: Uuid) -> Result<Vec<PeaceProposal>> {
        self.wars.list_peace_proposals_for_war(war_id).await
    }

    /// Proposals the guild still has to answer
    pub async fn get_pending_peace_proposals_for_guild(
        &self,
        guild_id: Uuid,
    ) -> Result<Vec<PeaceProposal>> {
        let now = Utc::now();
        Ok(self
            .wars
            .list_peace_proposals_for_target(guild_id)
            .await?
            .into_iter()
            .filter(|p| p.is_open_at(now))
            .collect())
    }

    /// Whether the guild is below its open war limit
    pub async fn can_guild_declare_war(&self, guild_id: Uuid) -> Result<bool> {
        let open = self
            .wars
            .list_wars_for_guild(guild_id)
            .await?
            .into_iter()
            .filter(|w| w.status.is_open())
            .count();
        Ok(open < self.config.max_active_wars)
    }

    /// Whether the guild recently won a war and is flagged against farming
    #[must_use]
    pub fn is_in_farming_cooldown(&self, guild_id: Uuid) -> bool {
        self.farming_cooldown_end(guild_id)
            .is_some_and(|end| Utc::now() < end)
    }

    /// End of the guild's farming cooldown, if one was applied
    #[must_use]
    pub fn farming_cooldown_end(&self, guild_id: Uuid) -> Option<DateTime<Utc>> {
        self.farming_cooldowns.get(&guild_id).map(|end| *end)
    }
}
