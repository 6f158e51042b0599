//! End-to-end generation flow tests: orchestrator, usage metering and
//! gallery persistence wired together over in-memory sqlite.

use chrono::{Duration, Utc};
use std::sync::Arc;
use studio_rs::auth::AuthUser;
use studio_rs::error::StudioError;
use studio_rs::gallery::{GalleryStore, SqliteGalleryStore};
use studio_rs::generation::mock::{MockGenerator, MockOutcome};
use studio_rs::generation::{GenerateParams, GenerationMode, Orchestrator, SourceImage};
use studio_rs::usage::types::UserLevel;
use studio_rs::usage::{SqliteUsageStore, UsageManager, UsageRecord, UsageStore};

struct World {
    orchestrator: Orchestrator,
    usage: Arc<UsageManager>,
    usage_store: Arc<SqliteUsageStore>,
    gallery: Arc<SqliteGalleryStore>,
}

async fn world(generator: MockGenerator) -> World {
    // One connection only: every pooled sqlite connection opens its own
    // in-memory database
    let db = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let usage_store = Arc::new(SqliteUsageStore::new(db.clone()).await.unwrap());
    let usage = Arc::new(UsageManager::new(
        Arc::clone(&usage_store) as Arc<dyn UsageStore>
    ));
    let gallery = Arc::new(SqliteGalleryStore::new(db).await.unwrap());
    let orchestrator = Orchestrator::new(
        Arc::new(generator),
        Arc::clone(&usage),
        Arc::clone(&gallery) as Arc<dyn GalleryStore>,
    );

    World {
        orchestrator,
        usage,
        usage_store,
        gallery,
    }
}

fn user() -> AuthUser {
    AuthUser {
        user_id: "user-1".to_string(),
        email: "user-1@example.com".to_string(),
        level: UserLevel::User,
    }
}

fn source(name: &str) -> SourceImage {
    SourceImage {
        data: "aW5wdXQ=".to_string(),
        mime_type: "image/jpeg".to_string(),
        name: Some(name.to_string()),
    }
}

fn generate_params(prompt: &str) -> GenerateParams {
    GenerateParams {
        prompt: prompt.to_string(),
        mode: GenerationMode::Generate,
        sources: vec![],
    }
}

#[tokio::test]
async fn multi_image_edit_charges_per_image_and_keeps_names() {
    let w = world(MockGenerator::new()).await;

    let outcome = w
        .orchestrator
        .run(
            &user(),
            GenerateParams {
                prompt: "remove the background".to_string(),
                mode: GenerationMode::Edit,
                sources: vec![source("a.jpg"), source("b.jpg"), source("c.jpg")],
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.images.len(), 3);
    assert!(outcome.warnings.is_empty());

    // One quota unit per image, not per request
    let check = w.usage.check_usage("user-1").await.unwrap();
    assert_eq!(check.images_generated, 3);
    assert_eq!(check.remaining, 22);

    let saved = w.gallery.list_for_user("user-1").await.unwrap();
    assert_eq!(saved.len(), 3);
    let mut names: Vec<_> = saved
        .iter()
        .filter_map(|s| s.original_name.clone())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
}

#[tokio::test]
async fn quota_runs_out_then_rolls_over() {
    let w = world(MockGenerator::new()).await;

    // Burn the free-tier quota one request at a time
    for i in 0..25 {
        let outcome = w
            .orchestrator
            .run(&user(), generate_params(&format!("prompt {i}")))
            .await
            .unwrap();
        assert_eq!(outcome.images.len(), 1);
    }

    // The 26th request is refused with the limit in the message
    let err = w
        .orchestrator
        .run(&user(), generate_params("one more"))
        .await
        .unwrap_err();
    match err {
        StudioError::QuotaExceeded { limit } => assert_eq!(limit, 25),
        other => panic!("expected QuotaExceeded, got {other:?}"),
    }

    // Force the period into the past; the next request succeeds again
    let mut record = w.usage_store.fetch("user-1").await.unwrap().unwrap();
    record.period_end = Utc::now() - Duration::days(1);
    w.usage_store.upsert(&record).await.unwrap();

    let outcome = w
        .orchestrator
        .run(&user(), generate_params("after rollover"))
        .await
        .unwrap();
    assert_eq!(outcome.images.len(), 1);

    let check = w.usage.check_usage("user-1").await.unwrap();
    assert_eq!(check.images_generated, 1);
    assert_eq!(check.remaining, 24);
}

#[tokio::test]
async fn mixed_edit_batch_returns_partial_results() {
    let generator = MockGenerator::with_outcomes(vec![
        MockOutcome::Image("QQ==".to_string()),
        MockOutcome::Empty,
        MockOutcome::Fail("timeout".to_string()),
        MockOutcome::Image("Qg==".to_string()),
    ]);
    let w = world(generator).await;

    let outcome = w
        .orchestrator
        .run(
            &user(),
            GenerateParams {
                prompt: "restore".to_string(),
                mode: GenerationMode::Edit,
                sources: vec![
                    source("a.jpg"),
                    source("b.jpg"),
                    source("c.jpg"),
                    source("d.jpg"),
                ],
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.images.len(), 2);
    assert!(outcome.warnings.iter().any(|w| w.contains("2 out of 4")));

    // Only the two successes were persisted and charged
    let check = w.usage.check_usage("user-1").await.unwrap();
    assert_eq!(check.images_generated, 2);
    assert_eq!(w.gallery.list_for_user("user-1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn all_calls_empty_is_no_result_and_nothing_persists() {
    let generator =
        MockGenerator::with_outcomes(vec![MockOutcome::Empty, MockOutcome::Empty]);
    let w = world(generator).await;

    let err = w
        .orchestrator
        .run(
            &user(),
            GenerateParams {
                prompt: "colorize".to_string(),
                mode: GenerationMode::Edit,
                sources: vec![source("a.jpg"), source("b.jpg")],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::NoResult));
    assert!(w.gallery.list_for_user("user-1").await.unwrap().is_empty());
    assert!(w.usage_store.fetch("user-1").await.unwrap().is_none());
}

#[tokio::test]
async fn usage_records_stay_isolated_per_user() {
    let w = world(MockGenerator::new()).await;

    let alice = AuthUser {
        user_id: "alice".to_string(),
        email: "alice@example.com".to_string(),
        level: UserLevel::User,
    };
    let bob = AuthUser {
        user_id: "bob".to_string(),
        email: "bob@example.com".to_string(),
        level: UserLevel::User,
    };

    w.orchestrator
        .run(&alice, generate_params("a fox"))
        .await
        .unwrap();
    w.orchestrator
        .run(&bob, generate_params("a crow"))
        .await
        .unwrap();
    w.orchestrator
        .run(&bob, generate_params("a heron"))
        .await
        .unwrap();

    assert_eq!(
        w.usage.check_usage("alice").await.unwrap().images_generated,
        1
    );
    assert_eq!(
        w.usage.check_usage("bob").await.unwrap().images_generated,
        2
    );

    let records: Vec<UsageRecord> = w.usage.list_records().await.unwrap();
    assert_eq!(records.len(), 2);
}
