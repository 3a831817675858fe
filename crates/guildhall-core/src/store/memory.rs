//! In-memory repository
//!
//! All repositories share one state behind a single `RwLock`, so a ledger
//! append and its balance update happen under the same write guard.
//! Data is lost when the process exits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DiplomacyStore, GuildStore, LedgerStore, MemberStore, RankStore, WarStore};
use crate::bank::{BankAudit, BankTransaction, EscrowHold, EscrowStatus};
use crate::diplomacy::{DiplomaticRelation, DiplomaticRequest, RelationType};
use crate::error::{Error, Result};
use crate::guild::{Guild, GuildMode, Member};
use crate::ranks::Rank;
use crate::war::{PeaceProposal, War};

#[derive(Default)]
struct State {
    guilds: HashMap<Uuid, Guild>,
    // player id -> membership
    members: HashMap<Uuid, Member>,
    ranks: HashMap<Uuid, Rank>,
    // guild id -> log in append order
    transactions: HashMap<Uuid, Vec<BankTransaction>>,
    holds: HashMap<Uuid, EscrowHold>,
    audits: HashMap<Uuid, Vec<BankAudit>>,
    wars: HashMap<Uuid, War>,
    peace_proposals: HashMap<Uuid, PeaceProposal>,
    requests: HashMap<Uuid, DiplomaticRequest>,
    relations: HashMap<Uuid, DiplomaticRelation>,
}

impl State {
    fn apply(&mut self, tx: &BankTransaction) -> Result<i64> {
        let guild = self
            .guilds
            .get_mut(&tx.guild_id)
            .ok_or(Error::GuildNotFound(tx.guild_id))?;
        let next = guild.bank_balance + tx.signed_amount();
        if next < 0 {
            return Err(Error::Invariant(format!(
                "transaction {} would leave guild {} at {}",
                tx.id, tx.guild_id, next
            )));
        }
        guild.bank_balance = next;
        self.transactions
            .entry(tx.guild_id)
            .or_default()
            .push(tx.clone());
        Ok(next)
    }
}

fn newest_first<T: Clone>(items: Option<&Vec<T>>, limit: Option<usize>) -> Vec<T> {
    let Some(items) = items else {
        return Vec::new();
    };
    let take = limit.unwrap_or(items.len());
    items.iter().rev().take(take).cloned().collect()
}

/// In-memory implementation of every repository trait
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GuildStore for MemoryStore {
    async fn insert_guild(&self, guild: &Guild) -> Result<()> {
        let mut state = self.state.write().await;
        if state.guilds.contains_key(&guild.id) {
            return Err(Error::Storage(format!("guild {} already exists", guild.id)));
        }
        state.guilds.insert(guild.id, guild.clone());
        Ok(())
    }

    async fn get_guild(&self, guild_id: Uuid) -> Result<Option<Guild>> {
        Ok(self.state.read().await.guilds.get(&guild_id).cloned())
    }

    async fn find_guild_by_name(&self, name: &str) -> Result<Option<Guild>> {
        let state = self.state.read().await;
        Ok(state
            .guilds
            .values()
            .find(|g| g.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn list_guilds(&self) -> Result<Vec<Guild>> {
        let state = self.state.read().await;
        let mut guilds: Vec<Guild> = state.guilds.values().cloned().collect();
        guilds.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(guilds)
    }

    async fn set_mode(
        &self,
        guild_id: Uuid,
        mode: GuildMode,
        changed_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(match state.guilds.get_mut(&guild_id) {
            Some(guild) => {
                guild.mode = mode;
                guild.mode_changed_at = Some(changed_at);
                true
            }
            None => false,
        })
    }

    async fn set_emergency_freeze(&self, guild_id: Uuid, frozen: bool) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(match state.guilds.get_mut(&guild_id) {
            Some(guild) => {
                guild.emergency_freeze = frozen;
                true
            }
            None => false,
        })
    }

    async fn delete_guild(&self, guild_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.guilds.remove(&guild_id).is_none() {
            return Ok(false);
        }
        state.members.retain(|_, m| m.guild_id != guild_id);
        state.ranks.retain(|_, r| r.guild_id != guild_id);
        state.transactions.remove(&guild_id);
        state.audits.remove(&guild_id);
        state.holds.retain(|_, h| h.guild_id != guild_id);
        // Finished wars stay in the opponent's record.
        state
            .wars
            .retain(|_, w| !(w.involves(guild_id) && w.status.is_open()));
        let State {
            wars,
            peace_proposals,
            ..
        } = &mut *state;
        peace_proposals.retain(|_, p| wars.contains_key(&p.war_id));
        state
            .requests
            .retain(|_, r| r.from_guild_id != guild_id && r.to_guild_id != guild_id);
        state.relations.retain(|_, r| !r.involves(guild_id));
        Ok(true)
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn insert_member(&self, member: &Member) -> Result<()> {
        let mut state = self.state.write().await;
        if state.members.contains_key(&member.player_id) {
            return Err(Error::Invariant(format!(
                "player {} already belongs to a guild",
                member.player_id
            )));
        }
        state.members.insert(member.player_id, member.clone());
        Ok(())
    }

    async fn get_member(&self, guild_id: Uuid, player_id: Uuid) -> Result<Option<Member>> {
        let state = self.state.read().await;
        Ok(state
            .members
            .get(&player_id)
            .filter(|m| m.guild_id == guild_id)
            .cloned())
    }

    async fn find_membership(&self, player_id: Uuid) -> Result<Option<Member>> {
        Ok(self.state.read().await.members.get(&player_id).cloned())
    }

    async fn list_members(&self, guild_id: Uuid) -> Result<Vec<Member>> {
        let state = self.state.read().await;
        let mut members: Vec<Member> = state
            .members
            .values()
            .filter(|m| m.guild_id == guild_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    async fn set_member_rank(
        &self,
        guild_id: Uuid,
        player_id: Uuid,
        rank_id: Uuid,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(match state.members.get_mut(&player_id) {
            Some(member) if member.guild_id == guild_id => {
                member.rank_id = rank_id;
                true
            }
            _ => false,
        })
    }

    async fn remove_member(&self, guild_id: Uuid, player_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let belongs = state
            .members
            .get(&player_id)
            .is_some_and(|m| m.guild_id == guild_id);
        if belongs {
            state.members.remove(&player_id);
        }
        Ok(belongs)
    }
}

#[async_trait]
impl RankStore for MemoryStore {
    async fn insert_rank(&self, rank: &Rank) -> Result<()> {
        self.state.write().await.ranks.insert(rank.id, rank.clone());
        Ok(())
    }

    async fn get_rank(&self, rank_id: Uuid) -> Result<Option<Rank>> {
        Ok(self.state.read().await.ranks.get(&rank_id).cloned())
    }

    async fn list_ranks(&self, guild_id: Uuid) -> Result<Vec<Rank>> {
        let state = self.state.read().await;
        let mut ranks: Vec<Rank> = state
            .ranks
            .values()
            .filter(|r| r.guild_id == guild_id)
            .cloned()
            .collect();
        ranks.sort_by_key(|r| r.priority);
        Ok(ranks)
    }

    async fn update_rank(&self, rank: &Rank) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(match state.ranks.get_mut(&rank.id) {
            Some(existing) => {
                *existing = rank.clone();
                true
            }
            None => false,
        })
    }

    async fn delete_rank(&self, rank_id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.ranks.remove(&rank_id).is_some())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append_transaction(&self, tx: &BankTransaction) -> Result<i64> {
        self.state.write().await.apply(tx)
    }

    async fn balance(&self, guild_id: Uuid) -> Result<Option<i64>> {
        let state = self.state.read().await;
        Ok(state.guilds.get(&guild_id).map(|g| g.bank_balance))
    }

    async fn list_transactions(
        &self,
        guild_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<BankTransaction>> {
        let state = self.state.read().await;
        Ok(newest_first(state.transactions.get(&guild_id), limit))
    }

    async fn open_escrow(&self, hold: &EscrowHold, debit: &BankTransaction) -> Result<i64> {
        let mut state = self.state.write().await;
        let balance = state.apply(debit)?;
        state.holds.insert(hold.id, hold.clone());
        Ok(balance)
    }

    async fn settle_escrow(
        &self,
        hold_id: Uuid,
        status: EscrowStatus,
        beneficiary_guild_id: Uuid,
        credit: &BankTransaction,
    ) -> Result<Option<i64>> {
        let mut state = self.state.write().await;
        match state.holds.get(&hold_id) {
            Some(hold) if hold.is_open() => {}
            Some(_) => return Ok(None),
            None => return Err(Error::EscrowNotFound(hold_id)),
        }
        let balance = state.apply(credit)?;
        if let Some(hold) = state.holds.get_mut(&hold_id) {
            hold.status = status;
            hold.beneficiary_guild_id = Some(beneficiary_guild_id);
            hold.resolved_at = Some(credit.timestamp);
        }
        Ok(Some(balance))
    }

    async fn get_hold(&self, hold_id: Uuid) -> Result<Option<EscrowHold>> {
        Ok(self.state.read().await.holds.get(&hold_id).cloned())
    }

    async fn list_open_holds(&self, guild_id: Uuid) -> Result<Vec<EscrowHold>> {
        let state = self.state.read().await;
        let mut holds: Vec<EscrowHold> = state
            .holds
            .values()
            .filter(|h| h.guild_id == guild_id && h.is_open())
            .cloned()
            .collect();
        holds.sort_by_key(|h| h.created_at);
        Ok(holds)
    }

    async fn insert_audit(&self, entry: &BankAudit) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .audits
            .entry(entry.guild_id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn list_audits(&self, guild_id: Uuid, limit: Option<usize>) -> Result<Vec<BankAudit>> {
        let state = self.state.read().await;
        Ok(newest_first(state.audits.get(&guild_id), limit))
    }
}

#[async_trait]
impl WarStore for MemoryStore {
    async fn insert_war(&self, war: &War) -> Result<()> {
        self.state.write().await.wars.insert(war.id, war.clone());
        Ok(())
    }

    async fn get_war(&self, war_id: Uuid) -> Result<Option<War>> {
        Ok(self.state.read().await.wars.get(&war_id).cloned())
    }

    async fn update_war(&self, war: &War) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(match state.wars.get_mut(&war.id) {
            Some(existing) => {
                *existing = war.clone();
                true
            }
            None => false,
        })
    }

    async fn list_wars_for_guild(&self, guild_id: Uuid) -> Result<Vec<War>> {
        let state = self.state.read().await;
        let mut wars: Vec<War> = state
            .wars
            .values()
            .filter(|w| w.involves(guild_id))
            .cloned()
            .collect();
        wars.sort_by(|a, b| b.declared_at.cmp(&a.declared_at));
        Ok(wars)
    }

    async fn find_open_war_between(&self, a: Uuid, b: Uuid) -> Result<Option<War>> {
        let state = self.state.read().await;
        Ok(state
            .wars
            .values()
            .find(|w| w.status.is_open() && w.involves(a) && w.involves(b))
            .cloned())
    }

    async fn list_open_wars(&self) -> Result<Vec<War>> {
        let state = self.state.read().await;
        let mut wars: Vec<War> = state
            .wars
            .values()
            .filter(|w| w.status.is_open())
            .cloned()
            .collect();
        wars.sort_by_key(|w| w.declared_at);
        Ok(wars)
    }

    async fn insert_peace_proposal(&self, proposal: &PeaceProposal) -> Result<()> {
        self.state
            .write()
            .await
            .peace_proposals
            .insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn get_peace_proposal(&self, proposal_id: Uuid) -> Result<Option<PeaceProposal>> {
        Ok(self
            .state
            .read()
            .await
            .peace_proposals
            .get(&proposal_id)
            .cloned())
    }

    async fn update_peace_proposal(&self, proposal: &PeaceProposal) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(match state.peace_proposals.get_mut(&proposal.id) {
            Some(existing) => {
                *existing = proposal.clone();
                true
            }
            None => false,
        })
    }

    async fn list_peace_proposals_for_war(&self, war_id: Uuid) -> Result<Vec<PeaceProposal>> {
        let state = self.state.read().await;
        let mut proposals: Vec<PeaceProposal> = state
            .peace_proposals
            .values()
            .filter(|p| p.war_id == war_id)
            .cloned()
            .collect();
        proposals.sort_by_key(|p| p.proposed_at);
        Ok(proposals)
    }

    async fn list_peace_proposals_for_target(
        &self,
        guild_id: Uuid,
    ) -> Result<Vec<PeaceProposal>> {
        let state = self.state.read().await;
        let mut proposals: Vec<PeaceProposal> = state
            .peace_proposals
            .values()
            .filter(|p| p.target_guild_id == guild_id)
            .cloned()
            .collect();
        proposals.sort_by_key(|p| p.proposed_at);
        Ok(proposals)
    }
}

#[async_trait]
impl DiplomacyStore for MemoryStore {
    async fn insert_request(&self, request: &DiplomaticRequest) -> Result<()> {
        let mut state = self.state.write().await;
        state.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_request(&self, request_id: Uuid) -> Result<Option<DiplomaticRequest>> {
        Ok(self.state.read().await.requests.get(&request_id).cloned())
    }

    async fn list_requests_for_guild(&self, guild_id: Uuid) -> Result<Vec<DiplomaticRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<DiplomaticRequest> = state
            .requests
            .values()
            .filter(|r| r.from_guild_id == guild_id || r.to_guild_id == guild_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn delete_request(&self, request_id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.requests.remove(&request_id).is_some())
    }

    async fn delete_expired_requests(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut state = self.state.write().await;
        let before = state.requests.len();
        state.requests.retain(|_, r| !r.is_expired_at(now));
        Ok(before - state.requests.len())
    }

    async fn insert_relation(&self, relation: &DiplomaticRelation) -> Result<()> {
        let mut state = self.state.write().await;
        state.relations.insert(relation.id, relation.clone());
        Ok(())
    }

    async fn list_relations(&self, guild_id: Uuid) -> Result<Vec<DiplomaticRelation>> {
        let state = self.state.read().await;
        let mut relations: Vec<DiplomaticRelation> = state
            .relations
            .values()
            .filter(|r| r.involves(guild_id))
            .cloned()
            .collect();
        relations.sort_by_key(|r| r.established_at);
        Ok(relations)
    }

    async fn find_relation(
        &self,
        a: Uuid,
        b: Uuid,
        kind: RelationType,
    ) -> Result<Option<DiplomaticRelation>> {
        let state = self.state.read().await;
        Ok(state
            .relations
            .values()
            .find(|r| r.kind == kind && r.involves(a) && r.involves(b))
            .cloned())
    }
}
