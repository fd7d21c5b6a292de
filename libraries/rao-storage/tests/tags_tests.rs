use rao_core::types::UpsertTagGroup;

use test_helpers::*;

#[tokio::test]
async fn test_tag_upsert_is_keyed_by_name() {
    let db = TestDb::new().await;
    let library_id = create_test_library(db.pool(), "/lib/a").await;

    let first = rao_storage::tags::upsert(db.pool(), library_id, "sunset").await.unwrap();
    let second = rao_storage::tags::upsert(db.pool(), library_id, "sunset").await.unwrap();

    assert!(first.is_created());
    assert!(!second.is_created());
    assert_eq!(first.value().id, second.value().id);
    assert_eq!(rao_storage::tags::get_by_library(db.pool(), library_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_tag_upserts_share_one_row() {
    let db = TestDb::new().await;
    let library_id = create_test_library(db.pool(), "/lib/a").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = db.pool().clone();
        handles.push(tokio::spawn(async move {
            rao_storage::tags::upsert(&pool, library_id, "beach")
                .await
                .unwrap()
                .into_inner()
                .id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn test_tag_group_color_update() {
    let db = TestDb::new().await;
    let library_id = create_test_library(db.pool(), "/lib/a").await;

    let group = |color: Option<&str>| UpsertTagGroup {
        library_id,
        name: "Places".to_string(),
        color: color.map(str::to_string),
    };

    assert!(rao_storage::tag_groups::upsert(db.pool(), group(Some("red"))).await.unwrap().is_created());
    assert!(matches!(
        rao_storage::tag_groups::upsert(db.pool(), group(Some("red"))).await.unwrap(),
        rao_core::Upserted::Unchanged(_)
    ));

    let updated = rao_storage::tag_groups::upsert(db.pool(), group(Some("blue"))).await.unwrap();
    assert!(updated.is_updated());
    assert_eq!(updated.value().color.as_deref(), Some("blue"));
}

#[tokio::test]
async fn test_group_membership_is_exact_and_ordered() {
    let db = TestDb::new().await;
    let library_id = create_test_library(db.pool(), "/lib/a").await;

    let group = rao_storage::tag_groups::upsert(
        db.pool(),
        UpsertTagGroup {
            library_id,
            name: "Places".to_string(),
            color: None,
        },
    )
    .await
    .unwrap()
    .into_inner();

    let mut ids = Vec::new();
    for name in ["paris", "tokyo", "lima"] {
        ids.push(rao_storage::tags::upsert(db.pool(), library_id, name).await.unwrap().into_inner().id);
    }

    assert!(rao_storage::tag_groups::set_members(db.pool(), group.id, &ids).await.unwrap());
    // Same membership again is a no-op
    assert!(!rao_storage::tag_groups::set_members(db.pool(), group.id, &ids).await.unwrap());

    // Dropping a member prunes its link
    assert!(rao_storage::tag_groups::set_members(db.pool(), group.id, &[ids[2], ids[0]]).await.unwrap());

    let members = rao_storage::tag_groups::get_members(db.pool(), group.id).await.unwrap();
    let names: Vec<_> = members.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["lima", "paris"]);
}
