use super::*;
use crate::guild::GuildMode;
use crate::testing::TestContext;

#[test]
fn test_default_ladder_order() {
    let guild_id = Uuid::new_v4();
    let ranks = default_ranks(guild_id);

    let names: Vec<&str> = ranks.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Owner", "Co-Owner", "Admin", "Mod", "Member"]);
    assert!(ranks.windows(2).all(|w| w[0].priority < w[1].priority));
    assert_eq!(ranks[0].permissions.len(), RankPermission::all().count());
    assert!(!ranks[4].has(RankPermission::DepositToBank));
}

#[test]
fn test_permission_table() {
    assert_eq!(RankPermission::all().count(), 47);
    assert_eq!(
        RankPermission::DeclareWar.category(),
        PermissionCategory::Relations
    );
    assert_eq!(
        "WITHDRAW_FROM_BANK".parse::<RankPermission>().unwrap(),
        RankPermission::WithdrawFromBank
    );
    assert!("WITHDRAW_EVERYTHING".parse::<RankPermission>().is_err());
    assert_eq!(RankPermission::ManageMode.to_string(), "MANAGE_MODE");
}

#[test]
fn test_rank_name_validation() {
    assert!(Rank::is_valid_name("Veteran"));
    assert!(!Rank::is_valid_name("   "));
    assert!(!Rank::is_valid_name(&"x".repeat(MAX_RANK_NAME_LEN + 1)));
}

#[tokio::test]
async fn test_has_permission() {
    let ctx = TestContext::new();
    let (guild, owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let member = ctx.member(guild.id).await;
    let ranks = &ctx.hall.ranks;

    assert!(ranks
        .has_permission(owner, guild.id, RankPermission::DeclareWar)
        .await
        .unwrap());
    assert!(!ranks
        .has_permission(member, guild.id, RankPermission::DeclareWar)
        .await
        .unwrap());
    assert!(!ranks
        .has_permission(Uuid::new_v4(), guild.id, RankPermission::ViewBankTransactions)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_promote_then_demote_restores_rank() {
    let ctx = TestContext::new();
    let (guild, owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let member = ctx.member(guild.id).await;
    let ranks = &ctx.hall.ranks;

    let before = ranks.get_player_rank(member, guild.id).await.unwrap().unwrap();
    assert!(ranks.promote(member, guild.id, owner).await.unwrap());
    let promoted = ranks.get_player_rank(member, guild.id).await.unwrap().unwrap();
    assert_eq!(promoted.name, "Mod");

    assert!(ranks.demote(member, guild.id, owner).await.unwrap());
    let after = ranks.get_player_rank(member, guild.id).await.unwrap().unwrap();
    assert_eq!(after.id, before.id);

    // Already at the bottom.
    assert!(!ranks.demote(member, guild.id, owner).await.unwrap());
}

#[tokio::test]
async fn test_promote_and_demote_skip_priority_gaps() {
    let ctx = TestContext::new();
    let (guild, owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let member = ctx.member(guild.id).await;
    let ranks = &ctx.hall.ranks;

    let mod_rank = ranks.get_rank_by_name(guild.id, "Mod").await.unwrap().unwrap();
    assert_eq!(mod_rank.priority, 3);
    assert!(ranks.delete_rank(mod_rank.id, owner).await.unwrap());

    let start = ranks.get_player_rank(member, guild.id).await.unwrap().unwrap();
    assert_eq!(start.priority, 4);

    assert!(ranks.promote(member, guild.id, owner).await.unwrap());
    let promoted = ranks.get_player_rank(member, guild.id).await.unwrap().unwrap();
    assert_eq!(promoted.name, "Admin");
    assert_eq!(promoted.priority, 2);

    assert!(ranks.demote(member, guild.id, owner).await.unwrap());
    let demoted = ranks.get_player_rank(member, guild.id).await.unwrap().unwrap();
    assert_eq!(demoted.id, start.id);
    assert_eq!(demoted.priority, 4);
}

#[tokio::test]
async fn test_promotion_stops_below_actor() {
    let ctx = TestContext::new();
    let (guild, owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let ranks = &ctx.hall.ranks;
    let co_owner_rank = ranks.get_rank_by_name(guild.id, "co-owner").await.unwrap().unwrap();
    let admin_rank = ranks.get_rank_by_name(guild.id, "Admin").await.unwrap().unwrap();

    let co_owner = ctx.member(guild.id).await;
    let admin = ctx.member(guild.id).await;
    assert!(ranks
        .assign_rank(co_owner, guild.id, co_owner_rank.id, owner)
        .await
        .unwrap());
    assert!(ranks
        .assign_rank(admin, guild.id, admin_rank.id, owner)
        .await
        .unwrap());

    // Admin -> Co-Owner would put them level with the actor.
    assert!(!ranks.promote(admin, guild.id, co_owner).await.unwrap());
    assert!(ranks.demote(admin, guild.id, co_owner).await.unwrap());
    // Nobody moves themselves or someone above them.
    assert!(!ranks.promote(co_owner, guild.id, co_owner).await.unwrap());
    assert!(!ranks.demote(owner, guild.id, co_owner).await.unwrap());
}

#[tokio::test]
async fn test_rank_changes_need_manage_members() {
    let ctx = TestContext::new();
    let (guild, _owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let a = ctx.member(guild.id).await;
    let b = ctx.member(guild.id).await;

    assert!(!ctx.hall.ranks.promote(b, guild.id, a).await.unwrap());
}

#[tokio::test]
async fn test_owner_cannot_change_own_rank_permissions() {
    let ctx = TestContext::new();
    let (guild, owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let ranks = &ctx.hall.ranks;
    let owner_rank = ranks.get_highest_rank(guild.id).await.unwrap().unwrap();

    let mut stripped = owner_rank.clone();
    stripped.permissions.remove(&RankPermission::DeclareWar);
    assert!(!ranks.update_rank(&stripped, owner).await.unwrap());
    assert!(!ranks
        .remove_rank_permission(owner_rank.id, RankPermission::WithdrawFromBank, owner)
        .await
        .unwrap());

    // Renaming keeps the permissions intact and is allowed.
    assert!(ranks
        .rename_rank(owner_rank.id, "Guildmaster", owner)
        .await
        .unwrap());
    let renamed = ranks.get_rank_by_id(owner_rank.id).await.unwrap().unwrap();
    assert_eq!(renamed.name, "Guildmaster");
    assert_eq!(renamed.permissions, owner_rank.permissions);
}

#[tokio::test]
async fn test_update_rank_keeps_priority_and_unique_names() {
    let ctx = TestContext::new();
    let (guild, owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let ranks = &ctx.hall.ranks;
    let mod_rank = ranks.get_rank_by_name(guild.id, "Mod").await.unwrap().unwrap();

    assert!(!ranks.rename_rank(mod_rank.id, "ADMIN", owner).await.unwrap());

    let mut edited = mod_rank.clone();
    edited.priority = 0;
    edited.permissions.insert(RankPermission::DeclareWar);
    assert!(ranks.update_rank(&edited, owner).await.unwrap());

    let stored = ranks.get_rank_by_id(mod_rank.id).await.unwrap().unwrap();
    assert_eq!(stored.priority, mod_rank.priority);
    assert!(stored.has(RankPermission::DeclareWar));
}

#[tokio::test]
async fn test_cannot_edit_rank_above_own() {
    let ctx = TestContext::new();
    let (guild, owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let ranks = &ctx.hall.ranks;
    let co_owner_rank = ranks.get_rank_by_name(guild.id, "Co-Owner").await.unwrap().unwrap();
    let owner_rank = ranks.get_highest_rank(guild.id).await.unwrap().unwrap();

    let co_owner = ctx.member(guild.id).await;
    ranks
        .assign_rank(co_owner, guild.id, co_owner_rank.id, owner)
        .await
        .unwrap();

    assert!(!ranks
        .remove_rank_permission(owner_rank.id, RankPermission::DeclareWar, co_owner)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_add_and_delete_rank() {
    let ctx = TestContext::new();
    let (guild, owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let member = ctx.member(guild.id).await;
    let ranks = &ctx.hall.ranks;

    assert!(ranks.add_rank(guild.id, "Recruit", member).await.unwrap().is_none());
    assert!(ranks.add_rank(guild.id, "member", owner).await.unwrap().is_none());

    let recruit = ranks.add_rank(guild.id, "Recruit", owner).await.unwrap().unwrap();
    assert_eq!(recruit.priority, 5);
    assert_eq!(
        ranks.get_lowest_rank(guild.id).await.unwrap().unwrap().id,
        recruit.id
    );

    let member_rank = ranks.get_rank_by_name(guild.id, "Member").await.unwrap().unwrap();
    assert!(!ranks.delete_rank(member_rank.id, owner).await.unwrap());
    assert!(ranks.delete_rank(recruit.id, owner).await.unwrap());
    assert_eq!(ranks.get_guild_ranks(guild.id).await.unwrap().len(), 5);
}
