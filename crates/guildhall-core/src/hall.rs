//! Service wiring
//!
//! `GuildHall` builds every service over one store and one shared set of
//! guild locks.

use std::sync::Arc;

use crate::bank::BankLedger;
use crate::config::EconomyConfig;
use crate::diplomacy::DiplomacyWorkbench;
use crate::error::Result;
use crate::guild::GuildRegistry;
use crate::locks::GuildLocks;
use crate::ranks::RankAuthority;
use crate::store::{DiplomacyStore, GuildStore, LedgerStore, MemberStore, RankStore, WarStore};
use crate::war::WarEngine;

/// All guild services over a single backing store
#[derive(Clone)]
pub struct GuildHall {
    /// Ranks and permissions
    pub ranks: Arc<RankAuthority>,
    /// Bank ledger
    pub bank: Arc<BankLedger>,
    /// Wars
    pub wars: Arc<WarEngine>,
    /// Diplomacy
    pub diplomacy: Arc<DiplomacyWorkbench>,
    /// Guilds and membership
    pub guilds: Arc<GuildRegistry>,
}

impl GuildHall {
    /// Validate `config`, then wire the services over `store`
    pub fn try_new<S>(store: Arc<S>, config: EconomyConfig) -> Result<Self>
    where
        S: GuildStore + MemberStore + RankStore + LedgerStore + WarStore + DiplomacyStore + 'static,
    {
        config.validate()?;
        Ok(Self::new(store, config))
    }

    /// Wire the services over `store`. The settings are used as given.
    pub fn new<S>(store: Arc<S>, config: EconomyConfig) -> Self
    where
        S: GuildStore + MemberStore + RankStore + LedgerStore + WarStore + DiplomacyStore + 'static,
    {
        let locks = Arc::new(GuildLocks::new());

        let ranks = Arc::new(RankAuthority::new(
            store.clone(),
            store.clone(),
            locks.clone(),
        ));
        let bank = Arc::new(BankLedger::new(
            store.clone(),
            store.clone(),
            ranks.clone(),
            config.bank,
        ));
        let wars = Arc::new(WarEngine::new(
            store.clone(),
            store.clone(),
            ranks.clone(),
            bank.clone(),
            locks.clone(),
            config.war,
        ));
        let diplomacy = Arc::new(DiplomacyWorkbench::new(
            store.clone(),
            store.clone(),
            ranks.clone(),
            locks.clone(),
            config.diplomacy,
        ));
        let guilds = Arc::new(GuildRegistry::new(
            store.clone(),
            store,
            ranks.clone(),
            wars.clone(),
            locks,
            config.guild,
        ));

        Self {
            ranks,
            bank,
            wars,
            diplomacy,
            guilds,
        }
    }
}
