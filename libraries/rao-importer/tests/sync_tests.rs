use rao_core::types::SyncRunStatus;
use rao_importer::{FailureKind, ImportError, SyncConfig};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use test_helpers::*;

#[tokio::test]
async fn test_end_to_end_fixture() {
    let env = TestEnv::new().await;

    let mut tokyo = asset("A1", "shibuya", "jpg");
    tokyo["folders"] = json!(["F3"]);
    tokyo["tags"] = json!(["tokyo", "night"]);
    tokyo["palettes"] = json!([{"color": [10, 20, 30]}, {"color": [255, 255, 255]}]);
    env.eagle.write_asset("A1", &tokyo);

    let mut peru = asset("A2", "machu", "png");
    peru["folders"] = json!(["F4", "GONE"]);
    env.eagle.write_asset("A2", &peru);

    env.eagle.write_asset("A3", &asset("A3", "clip", "mp4"));

    let summary = env.run().await;

    assert_eq!(summary.created, 3);
    assert_eq!(summary.skipped, 0);
    assert!(!summary.cancelled);
    assert_eq!(summary.folders.created, 5);
    assert_eq!(summary.tags.groups_created, 1);
    assert_eq!(summary.tags.tags_created, 2);
    assert_eq!(summary.tags.memberships_changed, 1);

    assert_eq!(
        rao_storage::folders::count_by_library(&env.pool, env.library_id).await.unwrap(),
        5
    );
    assert_eq!(
        rao_storage::tag_groups::get_by_library(&env.pool, env.library_id)
            .await
            .unwrap()
            .len(),
        1
    );

    let f3 = rao_storage::folders::find_by_external_id(&env.pool, env.library_id, "F3")
        .await
        .unwrap()
        .unwrap();
    let f4 = rao_storage::folders::find_by_external_id(&env.pool, env.library_id, "F4")
        .await
        .unwrap()
        .unwrap();

    let shibuya = env.image("A1", "shibuya", "jpg").await.unwrap();
    assert_eq!(shibuya.folder_ids, vec![f3.id]);
    assert_eq!(shibuya.tags, vec!["night", "tokyo"]);
    assert_eq!(shibuya.colors, vec!["#0a141e", "#ffffff"]);
    assert_eq!(shibuya.thumbnail_path, "images/A1.info/shibuya_thumbnail.png");

    // Unknown folder ids are dropped
    let machu = env.image("A2", "machu", "png").await.unwrap();
    assert_eq!(machu.folder_ids, vec![f4.id]);

    // "tokyo" is shared by the group and the image
    assert_eq!(
        rao_storage::tags::get_by_library(&env.pool, env.library_id)
            .await
            .unwrap()
            .len(),
        3
    );

    let library = rao_storage::libraries::get_by_id(&env.pool, env.library_id)
        .await
        .unwrap()
        .unwrap();
    assert!(library.last_synced_at.is_some());
}

#[tokio::test]
async fn test_resync_is_idempotent() {
    let env = TestEnv::new().await;

    let mut metadata = asset("A1", "cat", "jpg");
    metadata["folders"] = json!(["F2"]);
    metadata["tags"] = json!(["cute", " cute ", "animal"]);
    metadata["palettes"] = json!([{"color": [1, 2, 3]}]);
    env.eagle.write_asset("A1", &metadata);
    env.eagle.write_asset("A2", &asset("A2", "dog", "png"));

    let first = env.run().await;
    assert_eq!(first.created, 2);
    let before = env.image("A1", "cat", "jpg").await.unwrap();

    let second = env.run().await;

    assert_eq!(second.writes(), 0);
    assert_eq!(second.unchanged, 2);
    assert_eq!(second.folders.unchanged, 5);
    assert_eq!(env.image_count().await, 2);
    assert_eq!(env.image("A1", "cat", "jpg").await.unwrap(), before);
}

#[tokio::test]
async fn test_deletion_flag() {
    let env = TestEnv::new().await;

    let mut metadata = asset("A1", "cat", "jpg");
    metadata["tags"] = json!(["cute"]);
    metadata["palettes"] = json!([{"color": [1, 2, 3]}]);
    env.eagle.write_asset("A1", &metadata);
    env.run().await;
    let image = env.image("A1", "cat", "jpg").await.unwrap();

    metadata["isDeleted"] = json!(true);
    env.eagle.write_asset("A1", &metadata);

    let summary = env.run().await;
    assert_eq!(summary.deleted, 1);
    assert_eq!(env.image_count().await, 0);
    assert_eq!(
        rao_storage::images::count_colors(&env.pool, image.id).await.unwrap(),
        0
    );
    // The tag itself survives
    assert!(rao_storage::tags::find_by_name(&env.pool, env.library_id, "cute")
        .await
        .unwrap()
        .is_some());

    // Deleting an absent row is a no-op
    let again = env.run().await;
    assert_eq!(again.deleted, 0);
    assert_eq!(again.unchanged, 1);
}

#[tokio::test]
async fn test_flagged_asset_never_created() {
    let env = TestEnv::new().await;

    let mut metadata = asset("A1", "cat", "jpg");
    metadata["isDeleted"] = json!(true);
    env.eagle.write_asset("A1", &metadata);

    let summary = env.run().await;
    assert_eq!(summary.created, 0);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(env.image_count().await, 0);
}

#[tokio::test]
async fn test_color_cap() {
    let env = TestEnv::new().await;

    let palettes: Vec<_> = (0..15).map(|i| json!({"color": [i * 10, 0, 0]})).collect();
    let mut metadata = asset("A1", "rainbow", "png");
    metadata["palettes"] = json!(palettes);
    env.eagle.write_asset("A1", &metadata);

    env.run().await;

    let image = env.image("A1", "rainbow", "png").await.unwrap();
    assert_eq!(image.colors.len(), 9);
    assert_eq!(image.colors[0], "#000000");
    assert_eq!(image.colors[1], "#0a0000");
    assert_eq!(image.colors[8], "#500000");
    assert_eq!(
        rao_storage::images::count_colors(&env.pool, image.id).await.unwrap(),
        9
    );
}

#[tokio::test]
async fn test_unsupported_extension_rejected() {
    let env = TestEnv::new().await;

    env.eagle.write_asset("X1", &asset("X1", "mystery", "xyz"));
    env.eagle.write_asset("A1", &asset("A1", "cat", "jpg"));

    let summary = env.run().await;

    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, FailureKind::UnsupportedFormat);
    assert_eq!(summary.failures[0].path, "images/X1.info/metadata.json");
    assert!(env.image("X1", "mystery", "xyz").await.is_none());
}

#[tokio::test]
async fn test_unreadable_metadata_does_not_stop_run() {
    let env = TestEnv::new().await;

    env.eagle.write_raw_asset("BAD", "{\"id\": \"BAD\", ");
    env.eagle.write_asset("A1", &asset("A1", "cat", "jpg"));
    env.eagle.write_asset("A2", &asset("A2", "dog", "jpg"));

    let summary = env.run().await;

    assert_eq!(summary.created, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, FailureKind::MetadataUnreadable);
}

#[tokio::test]
async fn test_folder_parents_resolved_in_any_order() {
    let env = TestEnv::new().await;
    env.eagle.write_manifest(&json!({
        "folders": [
            {"id": "a", "name": "A", "parent": "b"},
            {"id": "b", "name": "B", "parent": "c"},
            {"id": "c", "name": "C"}
        ],
        "tagsGroups": []
    }));

    let summary = env.run().await;
    assert_eq!(summary.folders.created, 3);

    let get = |id: &'static str| {
        let pool = env.pool.clone();
        let library_id = env.library_id;
        async move {
            rao_storage::folders::find_by_external_id(&pool, library_id, id)
                .await
                .unwrap()
                .unwrap()
        }
    };
    let (a, b, c) = (get("a").await, get("b").await, get("c").await);

    assert_eq!(c.parent_id, None);
    assert_eq!(b.parent_id, Some(c.id));
    assert_eq!(a.parent_id, Some(b.id));
}

#[tokio::test]
async fn test_update_replaces_relations() {
    let env = TestEnv::new().await;

    let mut metadata = asset("A1", "cat", "jpg");
    metadata["folders"] = json!(["F1"]);
    metadata["tags"] = json!(["old"]);
    metadata["palettes"] = json!([{"color": [1, 1, 1]}, {"color": [2, 2, 2]}]);
    env.eagle.write_asset("A1", &metadata);
    env.run().await;

    metadata["folders"] = json!(["F5"]);
    metadata["tags"] = json!(["new", "fresh"]);
    metadata["palettes"] = json!([{"color": [9, 9, 9]}]);
    metadata["width"] = json!(1280);
    env.eagle.write_asset("A1", &metadata);

    let summary = env.run().await;
    assert_eq!(summary.updated, 1);

    let f5 = rao_storage::folders::find_by_external_id(&env.pool, env.library_id, "F5")
        .await
        .unwrap()
        .unwrap();
    let image = env.image("A1", "cat", "jpg").await.unwrap();
    assert_eq!(image.width, Some(1280));
    assert_eq!(image.folder_ids, vec![f5.id]);
    assert_eq!(image.tags, vec!["fresh", "new"]);
    assert_eq!(image.colors, vec!["#090909"]);
}

#[tokio::test]
async fn test_lease_contention() {
    let env = TestEnv::new().await;
    env.eagle.write_asset("A1", &asset("A1", "cat", "jpg"));

    assert!(
        rao_storage::sync_leases::acquire(&env.pool, env.library_id, "other-run", 60)
            .await
            .unwrap()
    );

    let err = env
        .sync(SyncConfig::default())
        .sync_library(env.library_id, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::RunLockContention(id) if id == env.library_id));
    assert_eq!(env.image_count().await, 0);

    // The other run's lease is untouched
    let lease = rao_storage::sync_leases::get(&env.pool, env.library_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lease.holder, "other-run");
}

#[tokio::test]
async fn test_lease_released_after_run() {
    let env = TestEnv::new().await;

    env.run().await;

    assert!(rao_storage::sync_leases::get(&env.pool, env.library_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_missing_manifest_fails_run_and_releases_lease() {
    let env = TestEnv::new().await;
    env.eagle.write_asset("A1", &asset("A1", "cat", "jpg"));
    env.eagle.remove_manifest();

    let err = env
        .sync(SyncConfig::default())
        .sync_library(env.library_id, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::ManifestUnreadable { .. }));
    assert_eq!(env.image_count().await, 0);
    assert!(rao_storage::sync_leases::get(&env.pool, env.library_id)
        .await
        .unwrap()
        .is_none());

    let run = rao_storage::sync_runs::get_latest(&env.pool, env.library_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.status, SyncRunStatus::Failed);
    assert!(run.error_message.is_some());
}

#[tokio::test]
async fn test_library_not_found() {
    let env = TestEnv::new().await;

    let err = env
        .sync(SyncConfig::default())
        .sync_library(9999, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::LibraryNotFound(9999)));
}

#[tokio::test]
async fn test_cancelled_before_image_phase() {
    let env = TestEnv::new().await;
    env.eagle.write_asset("A1", &asset("A1", "cat", "jpg"));
    env.eagle.write_asset("A2", &asset("A2", "dog", "jpg"));

    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = env
        .sync(SyncConfig::default())
        .sync_library(env.library_id, cancel)
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.processed(), 0);
    assert_eq!(env.image_count().await, 0);

    let run = rao_storage::sync_runs::get_latest(&env.pool, env.library_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.status, SyncRunStatus::Cancelled);

    let library = rao_storage::libraries::get_by_id(&env.pool, env.library_id)
        .await
        .unwrap()
        .unwrap();
    assert!(library.last_synced_at.is_none());
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_committed_assets() {
    let env = TestEnv::new().await;
    for i in 0..20 {
        let id = format!("A{i:02}");
        env.eagle.write_asset(&id, &asset(&id, "pic", "jpg"));
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let config = SyncConfig {
        concurrency: 1,
        ..SyncConfig::default()
    };

    let summary = env
        .sync(config)
        .with_progress(move |progress| {
            if progress.processed == 5 {
                trigger.cancel();
            }
        })
        .sync_library(env.library_id, cancel)
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.created, 5);
    assert_eq!(env.image_count().await, 5);
}

#[tokio::test]
async fn test_progress_reported_per_asset() {
    let env = TestEnv::new().await;
    for id in ["A1", "A2", "A3"] {
        env.eagle.write_asset(id, &asset(id, "pic", "jpg"));
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(AtomicUsize::new(0));
    let (calls_cb, last_cb) = (calls.clone(), last.clone());

    env.sync(SyncConfig::default())
        .with_progress(move |progress| {
            assert_eq!(progress.total, 3);
            calls_cb.fetch_add(1, Ordering::SeqCst);
            last_cb.store(progress.processed, Ordering::SeqCst);
        })
        .sync_library(env.library_id, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(last.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_prune_missing() {
    let env = TestEnv::new().await;
    env.eagle.write_asset("A1", &asset("A1", "cat", "jpg"));
    env.eagle.write_asset("A2", &asset("A2", "dog", "jpg"));
    env.run().await;

    env.eagle.remove_asset("A2");

    // Pruning is opt-in
    let summary = env.run().await;
    assert_eq!(summary.deleted, 0);
    assert_eq!(env.image_count().await, 2);

    let config = SyncConfig {
        prune_missing: true,
        ..SyncConfig::default()
    };
    let summary = env
        .sync(config)
        .sync_library(env.library_id, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.pruned, 1);
    assert!(env.image("A1", "cat", "jpg").await.is_some());
    assert!(env.image("A2", "dog", "jpg").await.is_none());
}

#[tokio::test]
async fn test_prune_spares_unreadable_assets() {
    let env = TestEnv::new().await;
    env.eagle.write_asset("A1", &asset("A1", "cat", "jpg"));
    env.run().await;

    env.eagle.write_raw_asset("A1", "corrupt");

    let config = SyncConfig {
        prune_missing: true,
        ..SyncConfig::default()
    };
    let summary = env
        .sync(config)
        .sync_library(env.library_id, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.deleted, 0);
    assert_eq!(env.image_count().await, 1);
}

#[tokio::test]
async fn test_asset_dir_without_metadata_is_reported() {
    let env = TestEnv::new().await;
    env.eagle.write_asset("A1", &asset("A1", "cat", "jpg"));
    env.eagle.write_asset("A2", &asset("A2", "dog", "jpg"));
    env.run().await;

    // Eagle rewrites metadata in place; the directory outlives the file
    env.eagle.remove_asset_metadata("A1");

    let config = SyncConfig {
        prune_missing: true,
        ..SyncConfig::default()
    };
    let summary = env
        .sync(config)
        .sync_library(env.library_id, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.failures[0].kind, FailureKind::MetadataUnreadable);
    assert_eq!(summary.failures[0].path, "images/A1.info/metadata.json");
    assert_eq!(summary.deleted, 0);
    assert!(env.image("A1", "cat", "jpg").await.is_some());
}

#[cfg(unix)]
#[tokio::test]
async fn test_unwalkable_asset_dir_is_reported() {
    let env = TestEnv::new().await;
    env.eagle.write_asset("A1", &asset("A1", "cat", "jpg"));
    env.eagle.write_asset("A2", &asset("A2", "dog", "jpg"));
    env.run().await;

    // Replace the asset directory with a link to nowhere
    env.eagle.remove_asset("A1");
    std::os::unix::fs::symlink(env.eagle.root().join("gone"), env.eagle.asset_dir("A1")).unwrap();

    let config = SyncConfig {
        prune_missing: true,
        follow_links: true,
        ..SyncConfig::default()
    };
    let summary = env
        .sync(config)
        .sync_library(env.library_id, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failures[0].kind, FailureKind::MetadataUnreadable);
    assert_eq!(summary.failures[0].path, "images/A1.info");
    assert_eq!(summary.deleted, 0);
    assert_eq!(env.image_count().await, 2);
}

#[cfg(unix)]
#[tokio::test]
async fn test_follow_links_imports_linked_assets() {
    let env = TestEnv::new().await;
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(
        outside.path().join("metadata.json"),
        asset("L1", "linked", "png").to_string(),
    )
    .unwrap();
    std::fs::create_dir_all(env.eagle.root().join("images")).unwrap();
    std::os::unix::fs::symlink(outside.path(), env.eagle.asset_dir("L1")).unwrap();

    let summary = env.run().await;
    assert_eq!(summary.created, 0);

    let config = SyncConfig {
        follow_links: true,
        ..SyncConfig::default()
    };
    let summary = env
        .sync(config)
        .sync_library(env.library_id, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.created, 1);
    assert!(env.image("L1", "linked", "png").await.is_some());
}

#[tokio::test]
async fn test_run_history_recorded() {
    let env = TestEnv::new().await;
    env.eagle.write_asset("A1", &asset("A1", "cat", "jpg"));
    env.eagle.write_asset("X1", &asset("X1", "odd", "xyz"));

    let summary = env.run().await;

    let run = rao_storage::sync_runs::get_by_id(&env.pool, summary.run_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.status, SyncRunStatus::Completed);
    assert_eq!(run.counts, summary.run_counts());
    assert_eq!(run.counts.created, 1);
    assert_eq!(run.counts.skipped, 1);
}

#[tokio::test]
async fn test_libraries_sync_in_parallel() {
    let first = TestEnv::new().await;
    first.eagle.write_asset("A1", &asset("A1", "cat", "jpg"));

    // Second library in the same database
    let second = EagleLibrary::new();
    second.write_asset("B1", &asset("B1", "dog", "jpg"));
    let second_id = rao_storage::libraries::create(
        &first.pool,
        &rao_core::types::CreateLibrary {
            name: "Second".to_string(),
            path: second.root().display().to_string(),
            source_type: rao_core::types::SourceType::Eagle,
        },
    )
    .await
    .unwrap()
    .id;

    let sync = first.sync(SyncConfig::default());
    let (a, b) = tokio::join!(
        sync.sync_library(first.library_id, CancellationToken::new()),
        sync.sync_library(second_id, CancellationToken::new()),
    );

    assert_eq!(a.unwrap().created, 1);
    assert_eq!(b.unwrap().created, 1);
    assert_eq!(
        rao_storage::folders::count_by_library(&first.pool, second_id).await.unwrap(),
        5
    );
}
