//! Shared fixtures for unit tests

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::config::EconomyConfig;
use crate::guild::{Guild, GuildMode};
use crate::hall::GuildHall;
use crate::store::{GuildStore, MemoryStore};

pub(crate) struct TestContext {
    pub hall: GuildHall,
    pub store: Arc<MemoryStore>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(EconomyConfig::default())
    }

    pub fn with_config(config: EconomyConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let hall = GuildHall::new(store.clone(), config);
        Self { hall, store }
    }

    /// Guild with a founder, the given mode and an opening balance.
    /// The mode is written straight to the store with an old timestamp so
    /// the switch cooldown does not apply afterwards.
    pub async fn guild(&self, name: &str, mode: GuildMode, balance: i64) -> (Guild, Uuid) {
        let owner = Uuid::new_v4();
        let guild = self
            .hall
            .guilds
            .create_guild(name, owner)
            .await
            .unwrap()
            .unwrap();
        self.store
            .set_mode(guild.id, mode, Utc::now() - Duration::days(30))
            .await
            .unwrap();
        if balance > 0 {
            self.hall
                .bank
                .deposit(guild.id, owner, balance, None)
                .await
                .unwrap()
                .unwrap();
        }
        let guild = self.hall.guilds.get_guild(guild.id).await.unwrap().unwrap();
        (guild, owner)
    }

    /// A new player who joined `guild_id` on the entry rank
    pub async fn member(&self, guild_id: Uuid) -> Uuid {
        let player = Uuid::new_v4();
        self.hall
            .guilds
            .add_member(guild_id, player)
            .await
            .unwrap()
            .unwrap();
        player
    }

    pub async fn balance(&self, guild_id: Uuid) -> i64 {
        self.hall.bank.get_balance(guild_id).await.unwrap()
    }
}
