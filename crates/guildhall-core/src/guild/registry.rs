//! Guild registry service
//!
//! Forms guilds, manages membership and mode, and disbands guilds. Guild
//! creation and joining also take the registry-wide lock (the nil id) so
//! that name uniqueness and one-guild-per-player hold under concurrency.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::{Guild, GuildMode, Member};
use crate::config::GuildConfig;
use crate::error::{Error, Result};
use crate::locks::GuildLocks;
use crate::ranks::{RankAuthority, RankPermission};
use crate::store::{GuildStore, MemberStore};
use crate::war::WarEngine;

const REGISTRY_LOCK: Uuid = Uuid::nil();

/// Guild formation, membership and mode
pub struct GuildRegistry {
    guilds: Arc<dyn GuildStore>,
    members: Arc<dyn MemberStore>,
    ranks: Arc<RankAuthority>,
    wars: Arc<WarEngine>,
    locks: Arc<GuildLocks>,
    config: GuildConfig,
}

impl GuildRegistry {
    /// Create a registry
    pub fn new(
        guilds: Arc<dyn GuildStore>,
        members: Arc<dyn MemberStore>,
        ranks: Arc<RankAuthority>,
        wars: Arc<WarEngine>,
        locks: Arc<GuildLocks>,
        config: GuildConfig,
    ) -> Self {
        Self {
            guilds,
            members,
            ranks,
            wars,
            locks,
            config,
        }
    }

    /// Form a guild with the default rank ladder; the founder holds the
    /// owner rank.
    pub async fn create_guild(&self, name: &str, owner_id: Uuid) -> Result<Option<Guild>> {
        if !Guild::is_valid_name(name) {
            return Ok(None);
        }
        let _registry = self.locks.lock(REGISTRY_LOCK).await;

        if self.guilds.find_guild_by_name(name.trim()).await?.is_some() {
            warn!(name = %name, "Guild name already taken");
            return Ok(None);
        }
        if self.members.find_membership(owner_id).await?.is_some() {
            warn!(player = %owner_id, "Founder already belongs to a guild");
            return Ok(None);
        }

        let guild = Guild::new(name.trim(), self.config.default_mode);
        self.guilds.insert_guild(&guild).await?;
        let ranks = self.ranks.create_default_ranks(guild.id).await?;
        let owner_rank = ranks
            .iter()
            .min_by_key(|r| r.priority)
            .ok_or_else(|| Error::Invariant("default rank ladder is empty".to_string()))?;
        self.members
            .insert_member(&Member::new(guild.id, owner_id, owner_rank.id))
            .await?;

        info!(guild = %guild.id, name = %guild.name, owner = %owner_id, "Guild created");
        Ok(Some(guild))
    }

    /// Join a guild on its entry rank. A player belongs to one guild at a
    /// time.
    pub async fn add_member(&self, guild_id: Uuid, player_id: Uuid) -> Result<Option<Member>> {
        let _guard = self.locks.lock_pair(REGISTRY_LOCK, guild_id).await;

        if self.guilds.get_guild(guild_id).await?.is_none() {
            return Ok(None);
        }
        if self.members.find_membership(player_id).await?.is_some() {
            return Ok(None);
        }
        let Some(entry_rank) = self.ranks.get_lowest_rank(guild_id).await? else {
            return Err(Error::Invariant(format!("guild {} has no ranks", guild_id)));
        };

        let member = Member::new(guild_id, player_id, entry_rank.id);
        self.members.insert_member(&member).await?;
        info!(guild = %guild_id, player = %player_id, rank = %entry_rank.name, "Member joined");
        Ok(Some(member))
    }

    /// Remove a member. Players may leave on their own; removing someone
    /// else needs `MANAGE_MEMBERS` and a higher rank. The last holder of
    /// the owner rank stays.
    pub async fn remove_member(&self, guild_id: Uuid, player_id: Uuid, actor_id: Uuid) -> Result<bool> {
        let _guard = self.locks.lock(guild_id).await;

        let Some(target_rank) = self.ranks.get_player_rank(player_id, guild_id).await? else {
            return Ok(false);
        };
        if actor_id != player_id {
            let Some(actor_rank) = self.ranks.get_player_rank(actor_id, guild_id).await? else {
                return Ok(false);
            };
            if !actor_rank.has(RankPermission::ManageMembers)
                || actor_rank.priority >= target_rank.priority
            {
                warn!(guild = %guild_id, actor = %actor_id, player = %player_id, "Member removal denied");
                return Ok(false);
            }
        }

        let is_owner_rank = self
            .ranks
            .get_highest_rank(guild_id)
            .await?
            .is_some_and(|r| r.id == target_rank.id);
        if is_owner_rank {
            let holders = self
                .members
                .list_members(guild_id)
                .await?
                .into_iter()
                .filter(|m| m.rank_id == target_rank.id)
                .count();
            if holders <= 1 {
                warn!(guild = %guild_id, player = %player_id, "The last owner cannot leave; disband instead");
                return Ok(false);
            }
        }

        let removed = self.members.remove_member(guild_id, player_id).await?;
        if removed {
            info!(guild = %guild_id, player = %player_id, "Member removed");
        }
        Ok(removed)
    }

    /// Switch guild mode. See `set_mode_at`.
    pub async fn set_mode(&self, guild_id: Uuid, actor_id: Uuid, mode: GuildMode) -> Result<bool> {
        self.set_mode_at(guild_id, actor_id, mode, Utc::now()).await
    }

    /// Switch guild mode as of `now`. Needs `MANAGE_MODE`, honours the
    /// switch cooldown, and refuses PEACEFUL while a war is active.
    pub async fn set_mode_at(
        &self,
        guild_id: Uuid,
        actor_id: Uuid,
        mode: GuildMode,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let _guard = self.locks.lock(guild_id).await;

        let Some(guild) = self.guilds.get_guild(guild_id).await? else {
            return Ok(false);
        };
        if !self
            .ranks
            .has_permission(actor_id, guild_id, RankPermission::ManageMode)
            .await?
        {
            warn!(guild = %guild_id, actor = %actor_id, "Mode switch denied: missing MANAGE_MODE");
            return Ok(false);
        }
        if guild.mode == mode {
            return Ok(false);
        }
        if let Some(changed) = guild.mode_changed_at {
            let ready_at = changed + self.config.mode_switch_cooldown();
            if now < ready_at {
                warn!(guild = %guild_id, ready_at = %ready_at, "Mode switch on cooldown");
                return Ok(false);
            }
        }
        if mode == GuildMode::Peaceful {
            let at_war = self
                .wars
                .get_wars_for_guild(guild_id)
                .await?
                .iter()
                .any(|w| w.is_active());
            if at_war {
                warn!(guild = %guild_id, "Cannot turn peaceful during an active war");
                return Ok(false);
            }
        }

        let saved = self.guilds.set_mode(guild_id, mode, now).await?;
        if saved {
            info!(guild = %guild_id, from = %guild.mode, to = %mode, "Guild mode changed");
        }
        Ok(saved)
    }

    /// Disband a guild. Only an owner-rank holder may do it. Open wars end
    /// first with every stake refunded; then the guild and everything it
    /// owns is removed.
    pub async fn disband_guild(&self, guild_id: Uuid, actor_id: Uuid) -> Result<bool> {
        let Some(guild) = self.guilds.get_guild(guild_id).await? else {
            return Ok(false);
        };
        let (Some(actor_rank), Some(owner_rank)) = (
            self.ranks.get_player_rank(actor_id, guild_id).await?,
            self.ranks.get_highest_rank(guild_id).await?,
        ) else {
            return Ok(false);
        };
        if actor_rank.id != owner_rank.id {
            warn!(guild = %guild_id, actor = %actor_id, "Disband denied: owner only");
            return Ok(false);
        }

        self.wars.end_all_for_guild(guild_id).await?;

        let guard = self.locks.lock(guild_id).await;
        let still_open = self
            .wars
            .get_wars_for_guild(guild_id)
            .await?
            .iter()
            .any(|w| w.status.is_open());
        if still_open {
            warn!(guild = %guild_id, "A war opened during disbandment; aborting");
            return Ok(false);
        }

        let deleted = self.guilds.delete_guild(guild_id).await?;
        drop(guard);
        if deleted {
            self.locks.forget(guild_id);
            info!(guild = %guild_id, name = %guild.name, balance = guild.bank_balance, "Guild disbanded");
        }
        Ok(deleted)
    }

    /// A guild by ID
    pub async fn get_guild(&self, guild_id: Uuid) -> Result<Option<Guild>> {
        self.guilds.get_guild(guild_id).await
    }

    /// A guild by case-insensitive name
    pub async fn find_guild_by_name(&self, name: &str) -> Result<Option<Guild>> {
        self.guilds.find_guild_by_name(name.trim()).await
    }

    /// All guilds
    pub async fn list_guilds(&self) -> Result<Vec<Guild>> {
        self.guilds.list_guilds().await
    }

    /// Members of a guild
    pub async fn list_members(&self, guild_id: Uuid) -> Result<Vec<Member>> {
        self.members.list_members(guild_id).await
    }
}
