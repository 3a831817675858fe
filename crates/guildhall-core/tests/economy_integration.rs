//! Integration tests for guildhall-core
//!
//! These exercise the services together through the public API:
//! - Wagered wars settled by kills
//! - Concurrent withdrawals against one bank
//! - Racing resolution triggers on the same war

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;
use guildhall_core::{
    EconomyConfig, Guild, GuildHall, GuildMode, GuildStore, MemoryStore, WarStatus,
};
use tokio_test::assert_ok;
use uuid::Uuid;

// ============================================================================
// Fixtures
// ============================================================================

struct World {
    hall: GuildHall,
    store: Arc<MemoryStore>,
}

impl World {
    fn new(config: EconomyConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let hall = GuildHall::new(store.clone(), config);
        Self { hall, store }
    }

    async fn guild(&self, name: &str, mode: GuildMode, balance: i64) -> (Guild, Uuid) {
        let owner = Uuid::new_v4();
        let guild = self
            .hall
            .guilds
            .create_guild(name, owner)
            .await
            .unwrap()
            .expect("guild created");
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
                .expect("opening deposit");
        }
        (guild, owner)
    }

    async fn balance(&self, guild_id: Uuid) -> i64 {
        self.hall.bank.get_balance(guild_id).await.unwrap()
    }
}

// ============================================================================
// Wars
// ============================================================================

#[tokio::test]
async fn test_wagered_war_settled_by_kills() {
    let world = World::new(EconomyConfig::default());
    let (a, a_owner) = world.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, b_owner) = world.guild("Beta", GuildMode::Peaceful, 300).await;
    let wars = &world.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, Duration::days(7), Vec::new(), 200, a_owner)
        .await
        .unwrap()
        .expect("declared");
    assert_eq!(war.status, WarStatus::PendingAcceptance);
    assert_eq!(world.balance(a.id).await, 300);

    let war = wars
        .accept_war(war.id, b_owner)
        .await
        .unwrap()
        .expect("accepted");
    assert_eq!(war.status, WarStatus::Active);
    assert_eq!(world.balance(b.id).await, 100);

    let mut last = None;
    for _ in 0..10 {
        last = wars.record_kill(a_owner, b_owner).await.unwrap();
    }
    let war = last.expect("kills counted");
    assert_eq!(war.status, WarStatus::Resolved);
    assert_eq!(war.winner, Some(a.id));

    assert_eq!(world.balance(a.id).await, 700);
    assert_eq!(world.balance(b.id).await, 100);
    assert_ok!(world.hall.bank.verify_balance(a.id).await);
    assert_ok!(world.hall.bank.verify_balance(b.id).await);
    assert!(world.hall.bank.get_open_holds(a.id).await.unwrap().is_empty());
    assert!(world.hall.bank.get_open_holds(b.id).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_resolution_settles_once() {
    let world = Arc::new(World::new(EconomyConfig::default()));
    let (a, a_owner) = world.guild("Alpha", GuildMode::Hostile, 1_000).await;
    let (b, b_owner) = world.guild("Beta", GuildMode::Hostile, 1_000).await;

    let war = world
        .hall
        .wars
        .declare_war(a.id, b.id, Duration::days(7), Vec::new(), 400, a_owner)
        .await
        .unwrap()
        .unwrap();
    world.hall.wars.accept_war(war.id, b_owner).await.unwrap().unwrap();

    let later = Utc::now() + Duration::days(8);
    let mut tasks = Vec::new();
    for i in 0..8 {
        let world = world.clone();
        let (war_id, winner) = (war.id, if i % 2 == 0 { a.id } else { b.id });
        tasks.push(tokio::spawn(async move {
            if i % 3 == 0 {
                world.hall.wars.expire_if_overdue_at(war_id, later).await
            } else {
                world.hall.wars.resolve_by_objective(war_id, winner).await
            }
        }));
    }

    let settled = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .filter(|changed| *changed)
        .count();
    assert_eq!(settled, 1);

    // Whatever won the race, no money was created or destroyed.
    let total = world.balance(a.id).await + world.balance(b.id).await;
    assert_eq!(total, 2_000);
    assert_ok!(world.hall.bank.verify_balance(a.id).await);
    assert_ok!(world.hall.bank.verify_balance(b.id).await);

    let war = world.hall.wars.get_war(war.id).await.unwrap().unwrap();
    assert_eq!(war.status, WarStatus::Resolved);
}

// ============================================================================
// Bank
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    let mut config = EconomyConfig::default();
    config.bank = config.bank.without_fees();
    let world = Arc::new(World::new(config));
    let (guild, owner) = world.guild("Alpha", GuildMode::Hostile, 1_000).await;
    let guild_id = guild.id;

    let tasks: Vec<_> = (0..25)
        .map(|_| {
            let world = world.clone();
            tokio::spawn(async move {
                world
                    .hall
                    .bank
                    .withdraw(guild_id, owner, 100, None)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let succeeded = join_all(tasks)
        .await
        .into_iter()
        .filter(|joined| joined.as_ref().unwrap().is_some())
        .count();

    assert_eq!(succeeded, 10);
    assert_eq!(world.balance(guild.id).await, 0);
    assert_ok!(world.hall.bank.verify_balance(guild.id).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wagers_share_one_balance() {
    let world = Arc::new(World::new(EconomyConfig::default()));
    let (a, a_owner) = world.guild("Alpha", GuildMode::Hostile, 500).await;
    let a_id = a.id;

    let mut rivals = Vec::new();
    for name in ["Beta", "Gamma", "Delta"] {
        rivals.push(world.guild(name, GuildMode::Peaceful, 0).await.0);
    }

    let tasks: Vec<_> = rivals
        .iter()
        .map(|rival| {
            let world = world.clone();
            let rival_id = rival.id;
            tokio::spawn(async move {
                world
                    .hall
                    .wars
                    .declare_war(a_id, rival_id, Duration::days(7), Vec::new(), 200, a_owner)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let declared = join_all(tasks)
        .await
        .into_iter()
        .filter(|joined| joined.as_ref().unwrap().is_some())
        .count();

    // 500 covers two wagers of 200, never three.
    assert_eq!(declared, 2);
    assert_eq!(world.balance(a.id).await, 100);
    assert_eq!(world.hall.bank.get_open_holds(a.id).await.unwrap().len(), 2);
}
