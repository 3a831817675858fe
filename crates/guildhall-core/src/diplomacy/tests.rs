use super::*;
use crate::guild::GuildMode;
use crate::testing::TestContext;
use chrono::Duration;

#[test]
fn test_relation_type_names() {
    assert_eq!(RelationType::Alliance.to_string(), "ALLIANCE");
    assert_eq!("TRUCE".parse::<RelationType>().unwrap(), RelationType::Truce);
    assert!("VASSAL".parse::<RelationType>().is_err());
}

#[tokio::test]
async fn test_alliance_round_trip() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let diplomacy = &ctx.hall.diplomacy;

    let request = diplomacy
        .send_request(a.id, b.id, RelationType::Alliance, a_owner, Some("friends?"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(diplomacy.get_outgoing_requests(a.id).await.unwrap().len(), 1);
    assert_eq!(diplomacy.get_incoming_requests(b.id).await.unwrap().len(), 1);
    assert!(diplomacy.get_incoming_requests(a.id).await.unwrap().is_empty());

    let relation = diplomacy
        .accept_request(request.id, b_owner)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(relation.guild_a, a.id);
    assert!(diplomacy
        .has_relation(b.id, a.id, RelationType::Alliance)
        .await
        .unwrap());
    assert!(!diplomacy
        .has_relation(a.id, b.id, RelationType::Truce)
        .await
        .unwrap());
    assert!(diplomacy.get_incoming_requests(b.id).await.unwrap().is_empty());
    assert_eq!(diplomacy.get_relations(a.id).await.unwrap().len(), 1);

    // An existing alliance cannot be requested again.
    assert!(diplomacy
        .send_request(b.id, a.id, RelationType::Alliance, b_owner, None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_send_refusals() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let a_member = ctx.member(a.id).await;
    let diplomacy = &ctx.hall.diplomacy;

    assert!(diplomacy
        .send_request(a.id, a.id, RelationType::Truce, a_owner, None)
        .await
        .unwrap()
        .is_none());
    assert!(diplomacy
        .send_request(a.id, b.id, RelationType::Truce, a_member, None)
        .await
        .unwrap()
        .is_none());
    assert!(diplomacy
        .send_request(a.id, Uuid::new_v4(), RelationType::Truce, a_owner, None)
        .await
        .unwrap()
        .is_none());

    diplomacy
        .send_request(a.id, b.id, RelationType::Truce, a_owner, None)
        .await
        .unwrap()
        .unwrap();
    // Pending in either direction counts as a duplicate.
    assert!(diplomacy
        .send_request(b.id, a.id, RelationType::Truce, b_owner, None)
        .await
        .unwrap()
        .is_none());
    assert!(diplomacy
        .send_request(b.id, a.id, RelationType::Alliance, b_owner, None)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_alliance_acceptance_needs_accept_alliances() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let co_owner = ctx.member(b.id).await;
    let co_owner_rank = ctx
        .hall
        .ranks
        .get_rank_by_name(b.id, "Co-Owner")
        .await
        .unwrap()
        .unwrap();
    ctx.hall
        .ranks
        .assign_rank(co_owner, b.id, co_owner_rank.id, b_owner)
        .await
        .unwrap();
    let diplomacy = &ctx.hall.diplomacy;

    let alliance = diplomacy
        .send_request(a.id, b.id, RelationType::Alliance, a_owner, None)
        .await
        .unwrap()
        .unwrap();
    let truce = diplomacy
        .send_request(a.id, b.id, RelationType::Truce, a_owner, None)
        .await
        .unwrap()
        .unwrap();

    // Co-Owner manages relations but may not accept alliances.
    assert!(diplomacy
        .accept_request(alliance.id, co_owner)
        .await
        .unwrap()
        .is_none());
    assert!(diplomacy
        .accept_request(truce.id, co_owner)
        .await
        .unwrap()
        .is_some());
    // Accepting on behalf of the sending side is not possible.
    assert!(diplomacy
        .accept_request(alliance.id, a_owner)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_reject_and_cancel() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, b_owner) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let outsider = ctx.member(b.id).await;
    let diplomacy = &ctx.hall.diplomacy;

    let first = diplomacy
        .send_request(a.id, b.id, RelationType::Truce, a_owner, None)
        .await
        .unwrap()
        .unwrap();
    assert!(!diplomacy.reject_request(first.id, outsider).await.unwrap());
    assert!(diplomacy.reject_request(first.id, b_owner).await.unwrap());
    assert!(!diplomacy.reject_request(first.id, b_owner).await.unwrap());

    let second = diplomacy
        .send_request(a.id, b.id, RelationType::Truce, a_owner, None)
        .await
        .unwrap()
        .unwrap();
    assert!(diplomacy.reject_request(second.id, a_owner).await.unwrap());
    assert!(diplomacy.get_outgoing_requests(a.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_requests_expire() {
    let ctx = TestContext::new();
    let (a, a_owner) = ctx.guild("Alpha", GuildMode::Hostile, 0).await;
    let (b, _) = ctx.guild("Beta", GuildMode::Hostile, 0).await;
    let diplomacy = &ctx.hall.diplomacy;

    let request = diplomacy
        .send_request(a.id, b.id, RelationType::Alliance, a_owner, None)
        .await
        .unwrap()
        .unwrap();
    assert!(!request.is_expired_at(request.created_at + Duration::days(6)));
    assert!(request.is_expired_at(request.expires_at));

    assert_eq!(diplomacy.expire_requests(Utc::now()).await.unwrap(), 0);
    assert_eq!(
        diplomacy
            .expire_requests(Utc::now() + Duration::days(8))
            .await
            .unwrap(),
        1
    );
    assert!(diplomacy.get_incoming_requests(b.id).await.unwrap().is_empty());
}
