//! Diplomacy workbench

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{DiplomaticRelation, DiplomaticRequest, RelationType};
use crate::config::DiplomacyConfig;
use crate::error::Result;
use crate::locks::GuildLocks;
use crate::ranks::{RankAuthority, RankPermission};
use crate::store::{DiplomacyStore, GuildStore};

/// Alliance and truce requests between guilds
pub struct DiplomacyWorkbench {
    store: Arc<dyn DiplomacyStore>,
    guilds: Arc<dyn GuildStore>,
    ranks: Arc<RankAuthority>,
    locks: Arc<GuildLocks>,
    config: DiplomacyConfig,
}

impl DiplomacyWorkbench {
    /// Create a workbench
    pub fn new(
        store: Arc<dyn DiplomacyStore>,
        guilds: Arc<dyn GuildStore>,
        ranks: Arc<RankAuthority>,
        locks: Arc<GuildLocks>,
        config: DiplomacyConfig,
    ) -> Self {
        Self {
            store,
            guilds,
            ranks,
            locks,
            config,
        }
    }

    fn accept_permission(kind: RelationType) -> RankPermission {
        match kind {
            RelationType::Alliance => RankPermission::AcceptAlliances,
            RelationType::Truce => RankPermission::ManageRelations,
        }
    }

    /// Send a request. Refused for self-requests, unknown targets, a
    /// relation of the same kind that already exists, or a request of the
    /// same kind already pending between the two guilds.
    pub async fn send_request(
        &self,
        from_guild_id: Uuid,
        to_guild_id: Uuid,
        kind: RelationType,
        actor_id: Uuid,
        message: Option<&str>,
    ) -> Result<Option<DiplomaticRequest>> {
        if from_guild_id == to_guild_id {
            return Ok(None);
        }
        let _guard = self.locks.lock_pair(from_guild_id, to_guild_id).await;

        if !self
            .ranks
            .has_permission(actor_id, from_guild_id, RankPermission::ManageRelations)
            .await?
        {
            warn!(guild = %from_guild_id, actor = %actor_id, "Diplomatic request denied: missing MANAGE_RELATIONS");
            return Ok(None);
        }
        if self.guilds.get_guild(to_guild_id).await?.is_none() {
            return Ok(None);
        }
        if self
            .store
            .find_relation(from_guild_id, to_guild_id, kind)
            .await?
            .is_some()
        {
            debug!(from = %from_guild_id, to = %to_guild_id, kind = %kind, "Relation already exists");
            return Ok(None);
        }

        let now = Utc::now();
        let pending = self.store.list_requests_for_guild(from_guild_id).await?;
        let duplicate = pending.iter().any(|r| {
            r.kind == kind
                && !r.is_expired_at(now)
                && ((r.from_guild_id == from_guild_id && r.to_guild_id == to_guild_id)
                    || (r.from_guild_id == to_guild_id && r.to_guild_id == from_guild_id))
        });
        if duplicate {
            debug!(from = %from_guild_id, to = %to_guild_id, kind = %kind, "Request already pending");
            return Ok(None);
        }

        let request = DiplomaticRequest {
            id: Uuid::new_v4(),
            kind,
            from_guild_id,
            to_guild_id,
            actor_id,
            message: message.map(str::to_string),
            created_at: now,
            expires_at: now + self.config.request_expiry(),
        };
        self.store.insert_request(&request).await?;
        info!(request = %request.id, from = %from_guild_id, to = %to_guild_id, kind = %kind, "Diplomatic request sent");
        Ok(Some(request))
    }

    /// Accept a request on behalf of the receiving guild
    pub async fn accept_request(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Option<DiplomaticRelation>> {
        let Some(request) = self.store.get_request(request_id).await? else {
            return Ok(None);
        };
        let _guard = self
            .locks
            .lock_pair(request.from_guild_id, request.to_guild_id)
            .await;
        let Some(request) = self.store.get_request(request_id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if request.is_expired_at(now) {
            self.store.delete_request(request_id).await?;
            return Ok(None);
        }
        let permission = Self::accept_permission(request.kind);
        if !self
            .ranks
            .has_permission(actor_id, request.to_guild_id, permission)
            .await?
        {
            warn!(request = %request_id, actor = %actor_id, permission = %permission, "Diplomatic acceptance denied");
            return Ok(None);
        }

        let relation = DiplomaticRelation {
            id: Uuid::new_v4(),
            kind: request.kind,
            guild_a: request.from_guild_id,
            guild_b: request.to_guild_id,
            established_at: now,
        };
        self.store.insert_relation(&relation).await?;
        self.store.delete_request(request_id).await?;
        info!(relation = %relation.id, kind = %relation.kind, "Diplomatic relation established");
        Ok(Some(relation))
    }

    /// Reject (receiver) or cancel (sender) a request
    pub async fn reject_request(&self, request_id: Uuid, actor_id: Uuid) -> Result<bool> {
        let Some(request) = self.store.get_request(request_id).await? else {
            return Ok(false);
        };
        let _guard = self
            .locks
            .lock_pair(request.from_guild_id, request.to_guild_id)
            .await;

        let receiver = self
            .ranks
            .has_permission(actor_id, request.to_guild_id, Self::accept_permission(request.kind))
            .await?;
        let sender = self
            .ranks
            .has_permission(actor_id, request.from_guild_id, RankPermission::ManageRelations)
            .await?;
        if !receiver && !sender {
            return Ok(false);
        }

        let removed = self.store.delete_request(request_id).await?;
        if removed {
            info!(request = %request_id, actor = %actor_id, "Diplomatic request withdrawn");
        }
        Ok(removed)
    }

    /// Live requests addressed to a guild
    pub async fn get_incoming_requests(&self, guild_id: Uuid) -> Result<Vec<DiplomaticRequest>> {
        let now = Utc::now();
        Ok(self
            .store
            .list_requests_for_guild(guild_id)
            .await?
            .into_iter()
            .filter(|r| r.to_guild_id == guild_id && !r.is_expired_at(now))
            .collect())
    }

    /// Live requests sent by a guild
    pub async fn get_outgoing_requests(&self, guild_id: Uuid) -> Result<Vec<DiplomaticRequest>> {
        let now = Utc::now();
        Ok(self
            .store
            .list_requests_for_guild(guild_id)
            .await?
            .into_iter()
            .filter(|r| r.from_guild_id == guild_id && !r.is_expired_at(now))
            .collect())
    }

    /// Relations involving a guild
    pub async fn get_relations(&self, guild_id: Uuid) -> Result<Vec<DiplomaticRelation>> {
        self.store.list_relations(guild_id).await
    }

    /// Whether two guilds hold a relation of `kind`
    pub async fn has_relation(&self, a: Uuid, b: Uuid, kind: RelationType) -> Result<bool> {
        Ok(self.store.find_relation(a, b, kind).await?.is_some())
    }

    /// Drop requests that lapsed at or before `now`
    pub async fn expire_requests(&self, now: DateTime<Utc>) -> Result<usize> {
        let removed = self.store.delete_expired_requests(now).await?;
        if removed > 0 {
            debug!(removed, "Expired diplomatic requests");
        }
        Ok(removed)
    }
}
