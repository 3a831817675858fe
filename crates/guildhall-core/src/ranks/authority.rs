//! Rank authority service
//!
//! Single owner of "which rank does this player hold" and of the
//! promote/demote ordering rules.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{default_ranks, Rank, RankPermission};
use crate::error::{Error, Result};
use crate::guild::Member;
use crate::locks::GuildLocks;
use crate::store::{MemberStore, RankStore};

/// Rank and permission service
pub struct RankAuthority {
    ranks: Arc<dyn RankStore>,
    members: Arc<dyn MemberStore>,
    locks: Arc<GuildLocks>,
}

enum Step {
    Up,
    Down,
}

impl RankAuthority {
    /// Create a rank authority
    pub fn new(
        ranks: Arc<dyn RankStore>,
        members: Arc<dyn MemberStore>,
        locks: Arc<GuildLocks>,
    ) -> Self {
        Self {
            ranks,
            members,
            locks,
        }
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// Whether `player_id` holds `permission` in `guild_id`.
    /// Non-members never have any permission.
    pub async fn has_permission(
        &self,
        player_id: Uuid,
        guild_id: Uuid,
        permission: RankPermission,
    ) -> Result<bool> {
        Ok(self
            .get_player_rank(player_id, guild_id)
            .await?
            .is_some_and(|rank| rank.has(permission)))
    }

    /// Membership of a player in a guild
    pub async fn get_member(&self, guild_id: Uuid, player_id: Uuid) -> Result<Option<Member>> {
        self.members.get_member(guild_id, player_id).await
    }

    /// The guild membership of a player, in any guild
    pub async fn get_membership(&self, player_id: Uuid) -> Result<Option<Member>> {
        self.members.find_membership(player_id).await
    }

    /// Rank currently held by a player
    pub async fn get_player_rank(&self, player_id: Uuid, guild_id: Uuid) -> Result<Option<Rank>> {
        let Some(member) = self.members.get_member(guild_id, player_id).await? else {
            return Ok(None);
        };
        let rank = self.ranks.get_rank(member.rank_id).await?;
        match rank {
            Some(rank) if rank.guild_id == guild_id => Ok(Some(rank)),
            Some(rank) => Err(Error::Invariant(format!(
                "member {} of guild {} holds rank {} of guild {}",
                player_id, guild_id, rank.id, rank.guild_id
            ))),
            None => Err(Error::RankNotFound(member.rank_id)),
        }
    }

    /// All ranks of a guild, most authoritative first
    pub async fn get_guild_ranks(&self, guild_id: Uuid) -> Result<Vec<Rank>> {
        self.ranks.list_ranks(guild_id).await
    }

    /// A rank by ID
    pub async fn get_rank_by_id(&self, rank_id: Uuid) -> Result<Option<Rank>> {
        self.ranks.get_rank(rank_id).await
    }

    /// A rank by case-insensitive name
    pub async fn get_rank_by_name(&self, guild_id: Uuid, name: &str) -> Result<Option<Rank>> {
        let ranks = self.ranks.list_ranks(guild_id).await?;
        Ok(ranks
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(name.trim())))
    }

    /// The owner rank (lowest priority value)
    pub async fn get_highest_rank(&self, guild_id: Uuid) -> Result<Option<Rank>> {
        let ranks = self.ranks.list_ranks(guild_id).await?;
        Ok(ranks.into_iter().min_by_key(|r| r.priority))
    }

    /// The entry rank (highest priority value)
    pub async fn get_lowest_rank(&self, guild_id: Uuid) -> Result<Option<Rank>> {
        let ranks = self.ranks.list_ranks(guild_id).await?;
        Ok(ranks.into_iter().max_by_key(|r| r.priority))
    }

    // ── Ladder setup ───────────────────────────────────────────────────

    /// Install the default ladder for a new guild
    pub async fn create_default_ranks(&self, guild_id: Uuid) -> Result<Vec<Rank>> {
        let ranks = default_ranks(guild_id);
        for rank in &ranks {
            self.ranks.insert_rank(rank).await?;
        }
        debug!(guild = %guild_id, count = ranks.len(), "Default ranks created");
        Ok(ranks)
    }

    /// Add a rank below the current lowest one
    pub async fn add_rank(&self, guild_id: Uuid, name: &str, actor_id: Uuid) -> Result<Option<Rank>> {
        let _guard = self.locks.lock(guild_id).await;

        if !self
            .has_permission(actor_id, guild_id, RankPermission::ManageRanks)
            .await?
        {
            warn!(guild = %guild_id, actor = %actor_id, "Add rank denied: missing MANAGE_RANKS");
            return Ok(None);
        }
        if !Rank::is_valid_name(name) {
            return Ok(None);
        }

        let ranks = self.ranks.list_ranks(guild_id).await?;
        if ranks.iter().any(|r| r.name.eq_ignore_ascii_case(name.trim())) {
            return Ok(None);
        }
        let priority = ranks.iter().map(|r| r.priority).max().map_or(0, |p| p + 1);

        let rank = Rank::new(guild_id, name.trim(), priority);
        self.ranks.insert_rank(&rank).await?;
        info!(guild = %guild_id, rank = %rank.name, priority, "Rank added");
        Ok(Some(rank))
    }

    /// Delete a rank nobody holds. The last rank of a guild is kept.
    pub async fn delete_rank(&self, rank_id: Uuid, actor_id: Uuid) -> Result<bool> {
        let Some(rank) = self.ranks.get_rank(rank_id).await? else {
            return Ok(false);
        };
        let guild_id = rank.guild_id;
        let _guard = self.locks.lock(guild_id).await;

        if !self
            .has_permission(actor_id, guild_id, RankPermission::ManageRanks)
            .await?
        {
            return Ok(false);
        }
        if self.ranks.list_ranks(guild_id).await?.len() <= 1 {
            warn!(guild = %guild_id, "Refusing to delete the last rank");
            return Ok(false);
        }
        let members = self.members.list_members(guild_id).await?;
        if members.iter().any(|m| m.rank_id == rank_id) {
            warn!(guild = %guild_id, rank = %rank.name, "Refusing to delete a rank that is held");
            return Ok(false);
        }

        let deleted = self.ranks.delete_rank(rank_id).await?;
        if deleted {
            info!(guild = %guild_id, rank = %rank.name, "Rank deleted");
        }
        Ok(deleted)
    }

    // ── Edits ──────────────────────────────────────────────────────────

    /// Persist name, permission and icon changes to an existing rank.
    ///
    /// Priority is not editable here. An actor holding the owner rank may
    /// not change the permissions of the owner rank.
    pub async fn update_rank(&self, rank: &Rank, actor_id: Uuid) -> Result<bool> {
        let Some(existing) = self.ranks.get_rank(rank.id).await? else {
            return Ok(false);
        };
        if existing.guild_id != rank.guild_id {
            warn!(rank = %rank.id, "Update rejected: rank moved between guilds");
            return Ok(false);
        }
        let guild_id = existing.guild_id;
        let _guard = self.locks.lock(guild_id).await;

        let Some(actor_rank) = self.get_player_rank(actor_id, guild_id).await? else {
            return Ok(false);
        };
        if !actor_rank.has(RankPermission::ManageRanks) {
            warn!(guild = %guild_id, actor = %actor_id, "Update rank denied: missing MANAGE_RANKS");
            return Ok(false);
        }
        if existing.priority < actor_rank.priority {
            warn!(guild = %guild_id, actor = %actor_id, rank = %existing.name, "Cannot edit a rank above your own");
            return Ok(false);
        }

        if !Rank::is_valid_name(&rank.name) {
            return Ok(false);
        }
        let siblings = self.ranks.list_ranks(guild_id).await?;
        if siblings
            .iter()
            .any(|r| r.id != rank.id && r.name.eq_ignore_ascii_case(rank.name.trim()))
        {
            return Ok(false);
        }

        let highest = siblings.iter().min_by_key(|r| r.priority);
        let editing_own_owner_rank = highest
            .is_some_and(|h| h.id == actor_rank.id && h.id == existing.id);
        if editing_own_owner_rank && existing.permissions != rank.permissions {
            warn!(
                guild = %guild_id,
                actor = %actor_id,
                "Owner may not change permissions of their own owner rank"
            );
            return Ok(false);
        }

        let mut updated = rank.clone();
        updated.name = rank.name.trim().to_string();
        updated.priority = existing.priority;
        let saved = self.ranks.update_rank(&updated).await?;
        if saved {
            info!(guild = %guild_id, rank = %updated.name, "Rank updated");
        }
        Ok(saved)
    }

    /// Rename a rank
    pub async fn rename_rank(&self, rank_id: Uuid, name: &str, actor_id: Uuid) -> Result<bool> {
        self.edit_rank(rank_id, actor_id, |rank| rank.name = name.to_string())
            .await
    }

    /// Replace the permissions of a rank
    pub async fn set_rank_permissions(
        &self,
        rank_id: Uuid,
        permissions: BTreeSet<RankPermission>,
        actor_id: Uuid,
    ) -> Result<bool> {
        self.edit_rank(rank_id, actor_id, |rank| rank.permissions = permissions)
            .await
    }

    /// Grant one permission
    pub async fn add_rank_permission(
        &self,
        rank_id: Uuid,
        permission: RankPermission,
        actor_id: Uuid,
    ) -> Result<bool> {
        self.edit_rank(rank_id, actor_id, |rank| {
            rank.permissions.insert(permission);
        })
        .await
    }

    /// Revoke one permission
    pub async fn remove_rank_permission(
        &self,
        rank_id: Uuid,
        permission: RankPermission,
        actor_id: Uuid,
    ) -> Result<bool> {
        self.edit_rank(rank_id, actor_id, |rank| {
            rank.permissions.remove(&permission);
        })
        .await
    }

    async fn edit_rank(
        &self,
        rank_id: Uuid,
        actor_id: Uuid,
        edit: impl FnOnce(&mut Rank),
    ) -> Result<bool> {
        let Some(mut rank) = self.ranks.get_rank(rank_id).await? else {
            return Ok(false);
        };
        edit(&mut rank);
        self.update_rank(&rank, actor_id).await
    }

    // ── Member placement ───────────────────────────────────────────────

    /// Move a member one rank up the ladder
    pub async fn promote(&self, player_id: Uuid, guild_id: Uuid, actor_id: Uuid) -> Result<bool> {
        self.step(player_id, guild_id, actor_id, Step::Up).await
    }

    /// Move a member one rank down the ladder
    pub async fn demote(&self, player_id: Uuid, guild_id: Uuid, actor_id: Uuid) -> Result<bool> {
        self.step(player_id, guild_id, actor_id, Step::Down).await
    }

    async fn step(&self, player_id: Uuid, guild_id: Uuid, actor_id: Uuid, step: Step) -> Result<bool> {
        let _guard = self.locks.lock(guild_id).await;

        let Some(actor_rank) = self.get_player_rank(actor_id, guild_id).await? else {
            return Ok(false);
        };
        if !actor_rank.has(RankPermission::ManageMembers) {
            warn!(guild = %guild_id, actor = %actor_id, "Rank change denied: missing MANAGE_MEMBERS");
            return Ok(false);
        }
        if actor_id == player_id {
            return Ok(false);
        }
        let Some(current) = self.get_player_rank(player_id, guild_id).await? else {
            return Ok(false);
        };
        // Nobody reshuffles a member at or above their own authority.
        if current.priority <= actor_rank.priority {
            return Ok(false);
        }

        let ranks = self.ranks.list_ranks(guild_id).await?;
        let target = match step {
            Step::Up => ranks
                .iter()
                .filter(|r| r.priority < current.priority)
                .max_by_key(|r| r.priority),
            Step::Down => ranks
                .iter()
                .filter(|r| r.priority > current.priority)
                .min_by_key(|r| r.priority),
        };
        let Some(target) = target else {
            debug!(guild = %guild_id, player = %player_id, "Already at the end of the ladder");
            return Ok(false);
        };
        if target.priority <= actor_rank.priority {
            return Ok(false);
        }

        let moved = self
            .members
            .set_member_rank(guild_id, player_id, target.id)
            .await?;
        if moved {
            info!(
                guild = %guild_id,
                player = %player_id,
                from = %current.name,
                to = %target.name,
                "Member rank changed"
            );
        }
        Ok(moved)
    }

    /// Place a member on a specific rank of the same guild
    pub async fn assign_rank(
        &self,
        player_id: Uuid,
        guild_id: Uuid,
        rank_id: Uuid,
        actor_id: Uuid,
    ) -> Result<bool> {
        let _guard = self.locks.lock(guild_id).await;

        let Some(actor_rank) = self.get_player_rank(actor_id, guild_id).await? else {
            return Ok(false);
        };
        if !actor_rank.has(RankPermission::ManageMembers) {
            return Ok(false);
        }
        let Some(target) = self.ranks.get_rank(rank_id).await? else {
            return Ok(false);
        };
        if target.guild_id != guild_id {
            warn!(guild = %guild_id, rank = %rank_id, "Rank belongs to another guild");
            return Ok(false);
        }
        let Some(current) = self.get_player_rank(player_id, guild_id).await? else {
            return Ok(false);
        };
        if actor_id != player_id && current.priority <= actor_rank.priority {
            return Ok(false);
        }
        if target.priority <= actor_rank.priority {
            return Ok(false);
        }

        self.members
            .set_member_rank(guild_id, player_id, rank_id)
            .await
    }
}
