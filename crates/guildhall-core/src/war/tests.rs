use std::sync::Arc;

use super::*;
use crate::config::{EconomyConfig, WarConfig};
use crate::error::Error;
use crate::guild::GuildMode;
use crate::locks::GuildLocks;
use crate::store::{MockWarStore, WarStore};
use crate::testing::TestContext;

fn week() -> Duration {
    Duration::days(7)
}

#[test]
fn test_objective_winner_and_sides() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let mut war = War::declare(a, b, week(), vec![WarObjective::kills(3)], 0, Utc::now());

    assert_eq!(war.status, WarStatus::PendingAcceptance);
    assert_eq!(war.opponent_of(a), Some(b));
    assert_eq!(war.opponent_of(Uuid::new_v4()), None);
    assert_eq!(war.objective_winner(), None);

    war.stats.defending_kills = 3;
    assert_eq!(war.objective_winner(), Some(b));
    assert_eq!(war.kills_of(b), 3);
    assert_eq!(war.holds().count(), 0);
}

#[test]
fn test_status_names() {
    assert!(WarStatus::Active.is_open());
    assert!(WarStatus::Expired.is_terminal());
    assert_eq!(
        "PENDING_ACCEPTANCE".parse::<WarStatus>().unwrap(),
        WarStatus::PendingAcceptance
    );
    assert_eq!(WarStatus::Resolved.to_string(), "RESOLVED");
}

// ── Engine ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unwagered_war_on_hostile_guild_starts_at_once() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, _) = ctx.guild("Beta", GuildMode::Hostile, 0).await;

    let war = ctx
        .hall
        .wars
        .declare_war(a.id, b.id, week(), Vec::new(), 0, a_owner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(war.status, WarStatus::Active);
    assert!(war.expires_at.is_some());
    assert_eq!(war.objectives, vec![WarObjective::kills(10)]);
}

#[tokio::test]
async fn test_wagered_war_scenario() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Peaceful, 300).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 200, a_owner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(war.status, WarStatus::PendingAcceptance);
    assert_eq!(ctx.balance(a.id).await, 300);

    let war = wars.accept_war(war.id, b_owner).await.unwrap().unwrap();
    assert_eq!(war.status, WarStatus::Active);
    assert_eq!(ctx.balance(b.id).await, 100);

    assert!(wars.resolve_by_objective(war.id, a.id).await.unwrap());
    assert_eq!(ctx.balance(a.id).await, 700);
    assert_eq!(ctx.balance(b.id).await, 100);
    assert!(wars.is_in_farming_cooldown(a.id));
    assert!(!wars.is_in_farming_cooldown(b.id));

    ctx.hall.bank.verify_balance(a.id).await.unwrap();
    ctx.hall.bank.verify_balance(b.id).await.unwrap();
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Hostile, 500).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 100, a_owner)
        .await
        .unwrap()
        .unwrap();
    wars.accept_war(war.id, b_owner).await.unwrap().unwrap();

    assert!(wars.resolve_by_objective(war.id, b.id).await.unwrap());
    assert!(!wars.resolve_by_objective(war.id, b.id).await.unwrap());
    assert!(!wars.resolve_by_objective(war.id, a.id).await.unwrap());
    assert!(!wars.expire_if_overdue_at(war.id, Utc::now() + Duration::days(30)).await.unwrap());

    assert_eq!(ctx.balance(a.id).await, 400);
    assert_eq!(ctx.balance(b.id).await, 600);
    let stored = wars.get_war(war.id).await.unwrap().unwrap();
    assert_eq!(stored.winner, Some(b.id));
    assert_eq!(stored.loser(), Some(a.id));
}

#[tokio::test]
async fn test_resolve_rejects_outsiders_and_unknown_wars() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, _) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 0, a_owner)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        wars.resolve_by_objective(war.id, Uuid::new_v4()).await,
        Err(Error::Invariant(_))
    ));
    assert!(matches!(
        wars.resolve_by_objective(Uuid::new_v4(), a.id).await,
        Err(Error::WarNotFound(_))
    ));
    assert!(matches!(
        wars.expire_if_overdue(Uuid::new_v4()).await,
        Err(Error::WarNotFound(_))
    ));
    assert!(wars.accept_war(Uuid::new_v4(), a_owner).await.unwrap().is_none());
    assert!(!wars.reject_war(Uuid::new_v4(), a_owner).await.unwrap());
}

#[tokio::test]
async fn test_declaration_refusals() {
    let ctx = TestContext::with_config({
        let mut config = EconomyConfig::default();
        config.war.max_active_wars = 1;
        config
    });
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 50).await;
    let (b, _) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let (c, _) = ctx.guild("Gamma", GuildMode::Hostile, 0).await;
    let grunt = ctx.member(a.id).await;
    let wars = &ctx.hall.wars;

    // Self-war, missing permission, unaffordable wager.
    assert!(wars
        .declare_war(a.id, a.id, week(), Vec::new(), 0, a_owner)
        .await
        .unwrap()
        .is_none());
    assert!(wars
        .declare_war(a.id, b.id, week(), Vec::new(), 0, grunt)
        .await
        .unwrap()
        .is_none());
    assert!(wars
        .declare_war(a.id, b.id, week(), Vec::new(), 100, a_owner)
        .await
        .unwrap()
        .is_none());
    assert!(wars.get_wars_for_guild(a.id).await.unwrap().is_empty());
    assert_eq!(ctx.balance(a.id).await, 50);

    assert!(matches!(
        wars.declare_war(a.id, b.id, week(), Vec::new(), -1, a_owner).await,
        Err(Error::InvalidAmount(-1))
    ));
    assert!(matches!(
        wars.declare_war(a.id, b.id, Duration::zero(), Vec::new(), 0, a_owner).await,
        Err(Error::Invariant(_))
    ));

    wars.declare_war(a.id, b.id, week(), Vec::new(), 0, a_owner)
        .await
        .unwrap()
        .unwrap();
    // Already at war with B, and out of war slots for C.
    assert!(wars
        .declare_war(a.id, b.id, week(), Vec::new(), 0, a_owner)
        .await
        .unwrap()
        .is_none());
    assert!(!wars.can_guild_declare_war(a.id).await.unwrap());
    assert!(wars
        .declare_war(a.id, c.id, week(), Vec::new(), 0, a_owner)
        .await
        .unwrap()
        .is_none());
    assert!(wars
        .get_current_war_between_guilds(b.id, a.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_out_of_range_declarations_are_errors() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, _) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let wars = &ctx.hall.wars;

    assert!(matches!(
        wars.declare_war(a.id, b.id, Duration::days(100_000_000), Vec::new(), 0, a_owner)
            .await,
        Err(Error::Invariant(_))
    ));
    assert!(matches!(
        wars.declare_war(a.id, b.id, Duration::days(31), Vec::new(), 200, a_owner)
            .await,
        Err(Error::Invariant(_))
    ));
    let objectives: Vec<WarObjective> = (1..=6).map(WarObjective::kills).collect();
    assert!(matches!(
        wars.declare_war(a.id, b.id, week(), objectives, 0, a_owner).await,
        Err(Error::Invariant(_))
    ));

    assert!(wars.get_wars_for_guild(a.id).await.unwrap().is_empty());
    assert_eq!(ctx.balance(a.id).await, 500);

    let objectives: Vec<WarObjective> = (1..=5).map(WarObjective::kills).collect();
    let war = wars
        .declare_war(a.id, b.id, Duration::days(30), objectives, 0, a_owner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(war.objectives.len(), 5);
    assert!(war.is_active());
}

#[tokio::test]
async fn test_accept_that_cannot_start_refunds_defender() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Peaceful, 500).await;
    let wars = &ctx.hall.wars;

    let mut war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 200, a_owner)
        .await
        .unwrap()
        .unwrap();
    war.duration_secs = i64::MAX;
    assert!(ctx.store.update_war(&war).await.unwrap());

    assert!(matches!(
        wars.accept_war(war.id, b_owner).await,
        Err(Error::Invariant(_))
    ));
    assert_eq!(ctx.balance(b.id).await, 500);
    assert!(ctx.hall.bank.get_open_holds(b.id).await.unwrap().is_empty());
    let stored = wars.get_war(war.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WarStatus::PendingAcceptance);

    // The declarer can still withdraw and get the stake back.
    assert!(wars.reject_war(war.id, a_owner).await.unwrap());
    assert_eq!(ctx.balance(a.id).await, 500);
}

#[tokio::test]
async fn test_reject_and_cancel_refund_wager() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Peaceful, 500).await;
    let wars = &ctx.hall.wars;

    let first = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 150, a_owner)
        .await
        .unwrap()
        .unwrap();
    let outsider = ctx.member(b.id).await;
    assert!(!wars.reject_war(first.id, outsider).await.unwrap());
    assert!(wars.reject_war(first.id, b_owner).await.unwrap());
    assert_eq!(ctx.balance(a.id).await, 500);
    assert_eq!(
        wars.get_war(first.id).await.unwrap().unwrap().status,
        WarStatus::Cancelled
    );

    let second = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 150, a_owner)
        .await
        .unwrap()
        .unwrap();
    assert!(wars.reject_war(second.id, a_owner).await.unwrap());
    assert!(!wars.reject_war(second.id, a_owner).await.unwrap());
    assert!(wars.accept_war(second.id, b_owner).await.unwrap().is_none());
    assert_eq!(ctx.balance(a.id).await, 500);
    assert_eq!(ctx.balance(b.id).await, 500);
}

#[tokio::test]
async fn test_accept_needs_matching_funds() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Peaceful, 100).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 200, a_owner)
        .await
        .unwrap()
        .unwrap();
    assert!(wars.accept_war(war.id, b_owner).await.unwrap().is_none());

    let stored = wars.get_war(war.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WarStatus::PendingAcceptance);
    assert_eq!(ctx.balance(b.id).await, 100);
}

#[tokio::test]
async fn test_pending_declaration_expires_with_refund() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Peaceful, 500).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 200, a_owner)
        .await
        .unwrap()
        .unwrap();
    assert!(!wars.expire_if_overdue(war.id).await.unwrap());

    let later = Utc::now() + Duration::hours(25);
    assert!(wars.expire_if_overdue_at(war.id, later).await.unwrap());
    assert!(!wars.expire_if_overdue_at(war.id, later).await.unwrap());

    let stored = wars.get_war(war.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WarStatus::Expired);
    assert_eq!(ctx.balance(a.id).await, 500);
    assert!(wars.accept_war(war.id, b_owner).await.unwrap().is_none());
}

#[tokio::test]
async fn test_overdue_war_is_a_draw() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Hostile, 300).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 200, a_owner)
        .await
        .unwrap()
        .unwrap();
    wars.accept_war(war.id, b_owner).await.unwrap().unwrap();

    let expired = wars
        .process_overdue_wars(Utc::now() + Duration::days(8))
        .await
        .unwrap();
    assert_eq!(expired, 1);

    let stored = wars.get_war(war.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WarStatus::Resolved);
    assert_eq!(stored.winner, None);
    assert_eq!(ctx.balance(a.id).await, 500);
    assert_eq!(ctx.balance(b.id).await, 300);
    assert!(ctx.hall.bank.get_open_holds(a.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_kills_reach_objective() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let b_grunt = ctx.member(b.id).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), vec![WarObjective::kills(3)], 0, a_owner)
        .await
        .unwrap()
        .unwrap();

    // Friendly fire and non-members do not count.
    assert!(wars.record_kill(b_owner, b_grunt).await.unwrap().is_none());
    assert!(wars.record_kill(Uuid::new_v4(), b_owner).await.unwrap().is_none());

    let after = wars.record_kill(b_owner, a_owner).await.unwrap().unwrap();
    assert_eq!(after.stats.defending_kills, 1);
    for _ in 0..2 {
        wars.record_kill(a_owner, b_grunt).await.unwrap().unwrap();
    }
    let finished = wars.record_kill(a_owner, b_owner).await.unwrap().unwrap();
    assert_eq!(finished.id, war.id);
    assert_eq!(finished.status, WarStatus::Resolved);
    assert_eq!(finished.winner, Some(a.id));
    assert_eq!(finished.stats.declaring_kills, 3);

    // The war is over; further kills go nowhere.
    assert!(wars.record_kill(a_owner, b_owner).await.unwrap().is_none());
}

#[tokio::test]
async fn test_surrender_hands_victory_to_opponent() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Hostile, 500).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 100, a_owner)
        .await
        .unwrap()
        .unwrap();
    wars.accept_war(war.id, b_owner).await.unwrap().unwrap();

    assert!(!wars.surrender(war.id, b.id, a_owner).await.unwrap());
    assert!(wars.surrender(war.id, b.id, b_owner).await.unwrap());
    assert_eq!(ctx.balance(a.id).await, 600);
    assert_eq!(ctx.balance(b.id).await, 400);
}

#[tokio::test]
async fn test_daily_upkeep_once_per_day() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, _) = ctx.guild("Beta", GuildMode::Hostile, 50).await;
    let wars = &ctx.hall.wars;

    wars.declare_war(a.id, b.id, week(), Vec::new(), 0, a_owner)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(wars.apply_daily_upkeep(Utc::now()).await.unwrap(), 0);

    let tomorrow = Utc::now() + Duration::days(1) + Duration::minutes(1);
    assert_eq!(wars.apply_daily_upkeep(tomorrow).await.unwrap(), 1);
    assert_eq!(ctx.balance(a.id).await, 400);
    // Beta cannot pay and is skipped.
    assert_eq!(ctx.balance(b.id).await, 50);

    assert_eq!(wars.apply_daily_upkeep(tomorrow).await.unwrap(), 0);
    assert_eq!(ctx.balance(a.id).await, 400);
}

#[tokio::test]
async fn test_history_and_win_loss_ratio() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let wars = &ctx.hall.wars;

    assert_eq!(wars.get_win_loss_ratio(a.id).await.unwrap(), 0.0);

    for (declaring, defending, actor, winner) in [
        (a.id, b.id, a_owner, a.id),
        (b.id, a.id, b_owner, a.id),
        (a.id, b.id, a_owner, b.id),
    ] {
        let war = wars
            .declare_war(declaring, defending, week(), Vec::new(), 0, actor)
            .await
            .unwrap()
            .unwrap();
        assert!(wars.resolve_by_objective(war.id, winner).await.unwrap());
    }

    assert_eq!(wars.get_win_loss_ratio(a.id).await.unwrap(), 2.0);
    assert_eq!(wars.get_win_loss_ratio(b.id).await.unwrap(), 0.5);
    assert_eq!(wars.get_war_history(a.id, Some(2)).await.unwrap().len(), 2);
    assert_eq!(wars.get_wars_for_guild(b.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_unbeaten_ratio_is_max() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, _) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 0, a_owner)
        .await
        .unwrap()
        .unwrap();
    wars.resolve_by_objective(war.id, a.id).await.unwrap();

    assert_eq!(wars.get_win_loss_ratio(a.id).await.unwrap(), f64::MAX);
    assert_eq!(wars.get_win_loss_ratio(b.id).await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_failed_insert_releases_wager() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, _) = ctx.guild("Beta", GuildMode::Hostile, 0).await;

    let mut store = MockWarStore::new();
    store
        .expect_find_open_war_between()
        .returning(|_, _| Ok(None));
    store
        .expect_list_wars_for_guild()
        .returning(|_| Ok(Vec::new()));
    store
        .expect_insert_war()
        .times(1)
        .returning(|_| Err(Error::Storage("disk full".to_string())));

    let engine = WarEngine::new(
        Arc::new(store),
        ctx.store.clone(),
        ctx.hall.ranks.clone(),
        ctx.hall.bank.clone(),
        Arc::new(GuildLocks::new()),
        WarConfig::default(),
    );

    let result = engine
        .declare_war(a.id, b.id, week(), Vec::new(), 200, a_owner)
        .await;
    assert!(matches!(result, Err(Error::Storage(_))));
    assert_eq!(ctx.balance(a.id).await, 500);
    assert!(ctx.hall.bank.get_open_holds(a.id).await.unwrap().is_empty());
}

// ── Peace ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_accepted_peace_is_a_refunded_draw() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 500).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Peaceful, 300).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 200, a_owner)
        .await
        .unwrap()
        .unwrap();
    // Nothing to make peace about before the war starts.
    assert!(wars
        .propose_peace(war.id, a.id, "truce", a_owner)
        .await
        .unwrap()
        .is_none());
    wars.accept_war(war.id, b_owner).await.unwrap().unwrap();

    let proposal = wars
        .propose_peace(war.id, a.id, "  return the border keep  ", a_owner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(proposal.target_guild_id, b.id);
    assert_eq!(proposal.terms, "return the border keep");
    assert_eq!(proposal.status, PeaceStatus::Pending);

    let pending = wars.get_pending_peace_proposals_for_guild(b.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(wars
        .get_pending_peace_proposals_for_guild(a.id)
        .await
        .unwrap()
        .is_empty());

    // The proposer cannot answer its own offer.
    assert!(wars
        .accept_peace(proposal.id, a.id, a_owner)
        .await
        .unwrap()
        .is_none());

    let ended = wars
        .accept_peace(proposal.id, b.id, b_owner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ended.status, WarStatus::Resolved);
    assert_eq!(ended.winner, None);
    assert_eq!(ended.end_reason.as_deref(), Some("peace agreement"));
    assert_eq!(ctx.balance(a.id).await, 500);
    assert_eq!(ctx.balance(b.id).await, 300);
    assert!(ctx.hall.bank.get_open_holds(a.id).await.unwrap().is_empty());
    assert!(ctx.hall.bank.get_open_holds(b.id).await.unwrap().is_empty());
    assert!(!wars.is_in_farming_cooldown(a.id));
    assert!(!wars.is_in_farming_cooldown(b.id));

    let recorded = wars.get_peace_proposals_for_war(war.id).await.unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].status, PeaceStatus::Accepted);
    assert!(recorded[0].responded_at.is_some());
    assert!(wars
        .accept_peace(proposal.id, b.id, b_owner)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_peace_proposal_refusals() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let (c, c_owner) = ctx.guild("Gamma", GuildMode::Hostile, 0).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 0, a_owner)
        .await
        .unwrap()
        .unwrap();
    let member = ctx.member(a.id).await;

    assert!(wars
        .propose_peace(war.id, c.id, "truce", c_owner)
        .await
        .unwrap()
        .is_none());
    assert!(wars
        .propose_peace(war.id, a.id, "truce", member)
        .await
        .unwrap()
        .is_none());
    assert!(wars
        .propose_peace(war.id, a.id, "   ", a_owner)
        .await
        .unwrap()
        .is_none());
    assert!(wars
        .propose_peace(war.id, a.id, &"x".repeat(MAX_PEACE_TERMS_LEN + 1), a_owner)
        .await
        .unwrap()
        .is_none());
    assert!(wars
        .propose_peace(Uuid::new_v4(), a.id, "truce", a_owner)
        .await
        .unwrap()
        .is_none());

    let first = wars
        .propose_peace(war.id, a.id, "truce", a_owner)
        .await
        .unwrap()
        .unwrap();
    // One open offer per side; the other side may still make its own.
    assert!(wars
        .propose_peace(war.id, a.id, "better truce", a_owner)
        .await
        .unwrap()
        .is_none());
    let counter = wars
        .propose_peace(war.id, b.id, "tribute", b_owner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counter.target_guild_id, a.id);
    assert_eq!(wars.get_peace_proposals_for_war(war.id).await.unwrap().len(), 2);

    // A plain member of the target guild cannot answer.
    let b_member = ctx.member(b.id).await;
    assert!(!wars.reject_peace(first.id, b.id, b_member).await.unwrap());
    assert!(!wars.reject_peace(first.id, a.id, a_owner).await.unwrap());
}

#[tokio::test]
async fn test_rejected_and_lapsed_proposals_leave_war_running() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let wars = &ctx.hall.wars;

    let war = wars
        .declare_war(a.id, b.id, week(), Vec::new(), 0, a_owner)
        .await
        .unwrap()
        .unwrap();

    let offer = wars
        .propose_peace(war.id, a.id, "truce", a_owner)
        .await
        .unwrap()
        .unwrap();
    assert!(wars.reject_peace(offer.id, b.id, b_owner).await.unwrap());
    assert!(!wars.reject_peace(offer.id, b.id, b_owner).await.unwrap());
    assert!(wars
        .accept_peace(offer.id, b.id, b_owner)
        .await
        .unwrap()
        .is_none());
    let stored = ctx.store.get_peace_proposal(offer.id).await.unwrap().unwrap();
    assert_eq!(stored.status, PeaceStatus::Rejected);

    // Rejection frees the side to offer again.
    let retry = wars
        .propose_peace(war.id, a.id, "truce, again", a_owner)
        .await
        .unwrap()
        .unwrap();

    let mut lapsed = retry.clone();
    lapsed.expires_at = Utc::now() - Duration::minutes(1);
    assert!(ctx.store.update_peace_proposal(&lapsed).await.unwrap());
    assert!(wars
        .get_pending_peace_proposals_for_guild(b.id)
        .await
        .unwrap()
        .is_empty());
    assert!(wars
        .accept_peace(retry.id, b.id, b_owner)
        .await
        .unwrap()
        .is_none());

    let stored = wars.get_war(war.id).await.unwrap().unwrap();
    assert_eq!(stored.status, WarStatus::Active);
}
