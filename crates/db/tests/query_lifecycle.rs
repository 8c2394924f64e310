//! Integration tests for query/asset/message lifecycle guards.
//!
//! Exercises the repository layer against a real database:
//! - Atomic query + asset creation
//! - Monotonic progress and single terminal transition for queries
//! - Terminal-asset immutability
//! - Append-only ordered message stream

use dreamcut_core::analysis::{AssetAnalysis, ImageAnalysis};
use dreamcut_core::status::{AssetStatus, Intent, MediaType, MessageType, QueryStage, QueryStatus};
use dreamcut_db::models::{AssetPatch, CreateAsset, CreateMessage, CreateQuery, QueryMetrics};
use dreamcut_db::repositories::{AssetRepo, MessageRepo, QueryRepo};
use sqlx::types::Json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn image_descriptor(url: &str) -> CreateAsset {
    CreateAsset {
        url: url.to_string(),
        filename: Some("photo.png".to_string()),
        media_type: MediaType::Image,
        user_description: None,
        file_size_bytes: 1024,
        metadata: serde_json::json!({}),
    }
}

fn new_query(assets: Vec<CreateAsset>) -> CreateQuery {
    CreateQuery {
        user_id: "user-1".to_string(),
        user_prompt: "make a calm lake video".to_string(),
        intent: Intent::Video,
        options: serde_json::json!({}),
        cost_estimate: 0.05,
        assets,
    }
}

fn image_analysis() -> Json<AssetAnalysis> {
    Json(AssetAnalysis::Image(ImageAnalysis {
        caption: "a lake".to_string(),
        objects: vec!["lake".to_string()],
        style_tags: vec![],
        width: Some(640),
        height: Some(480),
        quality_score: 0.9,
    }))
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn create_query_with_assets_is_atomic(pool: PgPool) {
    let input = new_query(vec![
        image_descriptor("https://example.com/a.png"),
        image_descriptor("https://example.com/b.png"),
    ]);
    let (query, assets) = QueryRepo::create_with_assets(&pool, &input)
        .await
        .expect("create should succeed");

    assert_eq!(query.status, QueryStatus::Processing);
    assert_eq!(query.stage, QueryStage::Init);
    assert_eq!(query.progress, 0);
    assert_eq!(assets.len(), 2);
    for asset in &assets {
        assert_eq!(asset.query_id, query.id);
        assert_eq!(asset.status, AssetStatus::Pending);
    }

    let listed = AssetRepo::list_by_query(&pool, query.id).await.unwrap();
    assert_eq!(listed.len(), 2);
}

// ---------------------------------------------------------------------------
// Query lifecycle guards
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn query_progress_never_decreases(pool: PgPool) {
    let (query, _) = QueryRepo::create_with_assets(&pool, &new_query(vec![]))
        .await
        .unwrap();

    let q = QueryRepo::advance_stage(&pool, query.id, QueryStage::Analyzing, 40)
        .await
        .unwrap()
        .expect("query is processing");
    assert_eq!(q.progress, 40);

    // A lower progress value must not move the row backwards.
    let q = QueryRepo::advance_stage(&pool, query.id, QueryStage::Merging, 10)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(q.progress, 40);
    assert_eq!(q.stage, QueryStage::Merging);
}

#[sqlx::test(migrations = "./migrations")]
async fn query_terminal_transition_happens_exactly_once(pool: PgPool) {
    let (query, _) = QueryRepo::create_with_assets(&pool, &new_query(vec![]))
        .await
        .unwrap();

    let metrics = QueryMetrics {
        processing_time_ms: 1500,
        models_used: vec!["text-analyzer-1".to_string()],
        cost_estimate: 0.02,
    };
    let payload = serde_json::json!({"plan": "generated"});

    let completed = QueryRepo::complete(&pool, query.id, &payload, &metrics)
        .await
        .unwrap()
        .expect("first completion succeeds");
    assert_eq!(completed.status, QueryStatus::Completed);
    assert_eq!(completed.stage, QueryStage::Done);
    assert_eq!(completed.progress, 100);
    assert_eq!(completed.payload, Some(payload.clone()));
    assert!(completed.completed_at.is_some());

    // Second completion and a late failure must both be rejected.
    assert!(QueryRepo::complete(&pool, query.id, &payload, &metrics)
        .await
        .unwrap()
        .is_none());
    assert!(QueryRepo::fail(&pool, query.id, "too late")
        .await
        .unwrap()
        .is_none());

    let reread = QueryRepo::find_by_id(&pool, query.id).await.unwrap().unwrap();
    assert_eq!(reread.status, QueryStatus::Completed);
    assert_eq!(reread.payload, Some(payload));
}

#[sqlx::test(migrations = "./migrations")]
async fn failed_query_has_error_and_no_payload(pool: PgPool) {
    let (query, _) = QueryRepo::create_with_assets(&pool, &new_query(vec![]))
        .await
        .unwrap();

    let failed = QueryRepo::fail(&pool, query.id, "upstream model unreachable")
        .await
        .unwrap()
        .expect("failure transition succeeds");
    assert_eq!(failed.status, QueryStatus::Failed);
    assert_eq!(
        failed.error_message.as_deref(),
        Some("upstream model unreachable")
    );
    assert!(failed.payload.is_none());
}

// ---------------------------------------------------------------------------
// Asset guards
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn terminal_asset_rejects_further_mutation(pool: PgPool) {
    let (_, assets) = QueryRepo::create_with_assets(
        &pool,
        &new_query(vec![image_descriptor("https://example.com/a.png")]),
    )
    .await
    .unwrap();
    let asset_id = assets[0].id;

    let patch = AssetPatch {
        status: Some(AssetStatus::Completed),
        analysis: Some(image_analysis()),
        model_used: Some("vision-analyzer-1".to_string()),
        quality_score: Some(0.9),
        ..Default::default()
    };
    let done = AssetRepo::update_progress(&pool, asset_id, 100, &patch)
        .await
        .unwrap()
        .expect("first terminal update succeeds");
    assert_eq!(done.status, AssetStatus::Completed);
    assert!(done.analyzed_at.is_some());

    // Any further update must match zero rows.
    let again = AssetRepo::update_progress(
        &pool,
        asset_id,
        50,
        &AssetPatch {
            status: Some(AssetStatus::Failed),
            error_message: Some("should never land".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(again.is_none());

    let reread = AssetRepo::find_by_id(&pool, asset_id).await.unwrap().unwrap();
    assert_eq!(reread.status, AssetStatus::Completed);
    assert_eq!(reread.progress, 100);
    assert!(reread.error_message.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn asset_patch_merges_only_set_fields(pool: PgPool) {
    let (_, assets) = QueryRepo::create_with_assets(
        &pool,
        &new_query(vec![image_descriptor("https://example.com/a.png")]),
    )
    .await
    .unwrap();
    let asset_id = assets[0].id;

    AssetRepo::update_progress(
        &pool,
        asset_id,
        25,
        &AssetPatch {
            status: Some(AssetStatus::Analyzing),
            worker_id: Some("worker-1".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    // Progress-only bump must not clear the worker id.
    let bumped = AssetRepo::update_progress(&pool, asset_id, 60, &AssetPatch::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bumped.progress, 60);
    assert_eq!(bumped.status, AssetStatus::Analyzing);
    assert_eq!(bumped.worker_id.as_deref(), Some("worker-1"));
    assert!(bumped.analyzed_at.is_none());
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn messages_are_append_only_and_ordered(pool: PgPool) {
    let (query, _) = QueryRepo::create_with_assets(&pool, &new_query(vec![]))
        .await
        .unwrap();

    for (i, kind) in [
        MessageType::Status,
        MessageType::Merge,
        MessageType::Final,
    ]
    .iter()
    .enumerate()
    {
        MessageRepo::append(
            &pool,
            query.id,
            *kind,
            &format!("step {i}"),
            &CreateMessage {
                emoji: Some("🎬".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    let messages = MessageRepo::list_by_query(&pool, query.id).await.unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].message_type, MessageType::Status);
    assert_eq!(messages[2].message_type, MessageType::Final);
    for pair in messages.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
    }
}
