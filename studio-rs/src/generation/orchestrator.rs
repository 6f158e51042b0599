//! Generation workflow
//!
//! One user request runs quota check → generation call(s) → best-effort
//! persistence. There is no lock around the check-then-increment sequence;
//! concurrent requests from the same user can overshoot the limit by design
//! (the store documents the race).

use crate::auth::AuthUser;
use crate::error::{Result, StudioError};
use crate::gallery::{GalleryStore, StoredImage};
use crate::generation::{
    GeneratedImage, GenerationMode, GenerationRequest, ImageGenerator, SourceImage,
};
use crate::usage::UsageManager;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fixed directives appended to every user prompt
const QUALITY_DIRECTIVE: &str = "Render at high quality with sharp detail and natural lighting.";
const ASPECT_DIRECTIVE: &str = "Keep the original aspect ratio.";

/// Remaining-quota level at or below which a warning is attached
const LOW_QUOTA_THRESHOLD: u32 = 3;

/// A user-initiated generation request
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub prompt: String,
    pub mode: GenerationMode,
    /// Input images, edit mode only
    pub sources: Vec<SourceImage>,
}

/// Successful results plus any non-fatal warnings
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub images: Vec<GeneratedImage>,
    pub warnings: Vec<String>,
}

/// Drives the per-request generation workflow
pub struct Orchestrator {
    generator: Arc<dyn ImageGenerator>,
    usage: Arc<UsageManager>,
    gallery: Arc<dyn GalleryStore>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        usage: Arc<UsageManager>,
        gallery: Arc<dyn GalleryStore>,
    ) -> Self {
        Orchestrator {
            generator,
            usage,
            gallery,
        }
    }

    /// Run one generation request for an authenticated user.
    ///
    /// Terminal failures (quota exhausted, no results, storage unreachable
    /// during the check) abort the request; per-image persistence failures
    /// are logged and absorbed.
    pub async fn run(&self, user: &AuthUser, params: GenerateParams) -> Result<GenerationOutcome> {
        // Quota gate. A storage error here propagates, which fails closed:
        // no generation happens without a successful check.
        let check = self.usage.check_usage(&user.user_id).await?;
        if !check.can_generate {
            info!(user_id = %user.user_id, limit = check.limit, "quota exhausted");
            return Err(StudioError::QuotaExceeded { limit: check.limit });
        }

        let mut warnings = Vec::new();
        if check.remaining <= LOW_QUOTA_THRESHOLD {
            warnings.push(format!(
                "Only {} generation{} left this period.",
                check.remaining,
                if check.remaining == 1 { "" } else { "s" }
            ));
        }

        let prompt = enrich_prompt(&params.prompt);

        // One call per input image in edit mode, dispatched concurrently and
        // jointly awaited; a single call in generate mode.
        let results: Vec<(Option<String>, Result<Option<GeneratedImage>>)> = match params.mode {
            GenerationMode::Edit => {
                if params.sources.is_empty() {
                    return Err(StudioError::InvalidRequest(
                        "edit mode requires at least one input image".to_string(),
                    ));
                }

                let calls = params.sources.iter().map(|source| {
                    let request = GenerationRequest {
                        prompt: prompt.clone(),
                        source: Some(source.clone()),
                    };
                    let generator = Arc::clone(&self.generator);
                    let name = source.name.clone();
                    async move { (name, generator.generate(&request).await) }
                });
                join_all(calls).await
            }
            GenerationMode::Generate => {
                let request = GenerationRequest {
                    prompt: prompt.clone(),
                    source: None,
                };
                vec![(None, self.generator.generate(&request).await)]
            }
        };

        let attempted = results.len();
        let mut successes: Vec<(Option<String>, GeneratedImage)> = Vec::new();
        for (name, result) in results {
            match result {
                Ok(Some(image)) => successes.push((name, image)),
                Ok(None) => debug!(user_id = %user.user_id, "call settled without image data"),
                Err(e) => warn!(user_id = %user.user_id, "generation call failed: {}", e),
            }
        }

        if successes.is_empty() {
            return Err(StudioError::NoResult);
        }
        if params.mode == GenerationMode::Edit && successes.len() < attempted {
            warnings.push(format!(
                "{} out of {} images were edited successfully.",
                successes.len(),
                attempted
            ));
        }

        // Best-effort persistence: each image is saved and then charged
        // independently. A failed save skips the charge for that image; a
        // failed charge after a successful save is absorbed. Neither rolls
        // back the others or surfaces to the caller.
        let mut images = Vec::with_capacity(successes.len());
        for (original_name, image) in successes {
            let stored = StoredImage {
                id: Uuid::new_v4().to_string(),
                user_id: user.user_id.clone(),
                prompt: params.prompt.clone(),
                mode: params.mode,
                mime_type: image.mime_type.clone(),
                original_name,
                data: image.data.clone(),
                created_at: Utc::now(),
            };

            match self.gallery.save_image(&stored).await {
                Ok(()) => {
                    if let Err(e) = self
                        .usage
                        .record_generation(&user.user_id, &user.email)
                        .await
                    {
                        warn!(user_id = %user.user_id, image_id = %stored.id,
                              "usage increment failed: {}", e);
                    }
                }
                Err(e) => {
                    warn!(user_id = %user.user_id, image_id = %stored.id,
                          "image save failed: {}", e);
                }
            }

            images.push(image);
        }

        info!(user_id = %user.user_id, count = images.len(), mode = params.mode.as_str(),
              "generation request complete");
        Ok(GenerationOutcome { images, warnings })
    }
}

/// Append the fixed quality and aspect-ratio directives to a user prompt
fn enrich_prompt(prompt: &str) -> String {
    format!("{}. {} {}", prompt.trim_end_matches('.'), QUALITY_DIRECTIVE, ASPECT_DIRECTIVE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::{ImageSummary, SqliteGalleryStore};
    use crate::generation::mock::{MockGenerator, MockOutcome};
    use crate::usage::types::UserLevel;
    use crate::usage::SqliteUsageStore;
    use async_trait::async_trait;

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
            mime_type: "image/png".to_string(),
            name: Some(name.to_string()),
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        usage: Arc<UsageManager>,
        gallery: Arc<SqliteGalleryStore>,
    }

    // One connection only: every pooled sqlite connection opens its own
    // in-memory database
    async fn memory_pool() -> sqlx::SqlitePool {
        sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn harness(generator: MockGenerator) -> Harness {
        let db = memory_pool().await;
        let usage = Arc::new(UsageManager::new(Arc::new(
            SqliteUsageStore::new(db.clone()).await.unwrap(),
        )));
        let gallery = Arc::new(SqliteGalleryStore::new(db).await.unwrap());
        let orchestrator = Orchestrator::new(
            Arc::new(generator),
            Arc::clone(&usage),
            Arc::clone(&gallery) as Arc<dyn GalleryStore>,
        );
        Harness {
            orchestrator,
            usage,
            gallery,
        }
    }

    /// Gallery store whose saves always fail
    struct BrokenGallery;

    #[async_trait]
    impl GalleryStore for BrokenGallery {
        async fn save_image(&self, _image: &StoredImage) -> crate::error::Result<()> {
            Err(StudioError::Generation("disk full".to_string()))
        }

        async fn list_for_user(
            &self,
            _user_id: &str,
        ) -> crate::error::Result<Vec<ImageSummary>> {
            Ok(Vec::new())
        }

        async fn fetch(
            &self,
            _user_id: &str,
            _image_id: &str,
        ) -> crate::error::Result<Option<StoredImage>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_generate_mode_saves_and_charges_once() {
        let h = harness(MockGenerator::new()).await;

        let outcome = h
            .orchestrator
            .run(
                &user(),
                GenerateParams {
                    prompt: "a fox".to_string(),
                    mode: GenerationMode::Generate,
                    sources: vec![],
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.images.len(), 1);
        assert!(outcome.warnings.is_empty());

        let check = h.usage.check_usage("user-1").await.unwrap();
        assert_eq!(check.images_generated, 1);

        let saved = h.gallery.list_for_user("user-1").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].prompt, "a fox");
    }

    #[tokio::test]
    async fn test_edit_mode_partial_failure_warns_with_counts() {
        // Scenario E: 3 inputs, one call fails
        let generator = MockGenerator::with_outcomes(vec![
            MockOutcome::Image("QQ==".to_string()),
            MockOutcome::Fail("upstream 500".to_string()),
            MockOutcome::Image("Qg==".to_string()),
        ]);
        let h = harness(generator).await;

        let outcome = h
            .orchestrator
            .run(
                &user(),
                GenerateParams {
                    prompt: "sharpen".to_string(),
                    mode: GenerationMode::Edit,
                    sources: vec![source("a.png"), source("b.png"), source("c.png")],
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.images.len(), 2);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("2 out of 3")));

        // One quota unit per saved image, not per request
        let check = h.usage.check_usage("user-1").await.unwrap();
        assert_eq!(check.images_generated, 2);
    }

    #[tokio::test]
    async fn test_generate_mode_empty_result_is_no_result() {
        // Scenario F
        let h = harness(MockGenerator::with_outcomes(vec![MockOutcome::Empty])).await;

        let result = h
            .orchestrator
            .run(
                &user(),
                GenerateParams {
                    prompt: "a fox".to_string(),
                    mode: GenerationMode::Generate,
                    sources: vec![],
                },
            )
            .await;

        assert!(matches!(result, Err(StudioError::NoResult)));

        // Nothing was charged for a failed generation
        let check = h.usage.check_usage("user-1").await.unwrap();
        assert_eq!(check.images_generated, 0);
    }

    #[tokio::test]
    async fn test_quota_exhausted_aborts_before_generation() {
        let generator = MockGenerator::new();
        let h = harness(generator).await;

        // Burn the whole free-tier quota
        for _ in 0..25 {
            h.usage
                .record_generation("user-1", "user-1@example.com")
                .await
                .unwrap();
        }

        let result = h
            .orchestrator
            .run(
                &user(),
                GenerateParams {
                    prompt: "a fox".to_string(),
                    mode: GenerationMode::Generate,
                    sources: vec![],
                },
            )
            .await;

        match result {
            Err(StudioError::QuotaExceeded { limit }) => assert_eq!(limit, 25),
            other => panic!("expected QuotaExceeded, got {:?}", other.map(|o| o.images.len())),
        }
    }

    #[tokio::test]
    async fn test_low_quota_warning_attached() {
        let h = harness(MockGenerator::new()).await;

        for _ in 0..23 {
            h.usage
                .record_generation("user-1", "user-1@example.com")
                .await
                .unwrap();
        }

        // remaining = 2, low but positive: warn and proceed
        let outcome = h
            .orchestrator
            .run(
                &user(),
                GenerateParams {
                    prompt: "a fox".to_string(),
                    mode: GenerationMode::Generate,
                    sources: vec![],
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.images.len(), 1);
        assert!(outcome.warnings.iter().any(|w| w.contains("2 generations left")));
    }

    #[tokio::test]
    async fn test_edit_mode_without_sources_rejected() {
        let h = harness(MockGenerator::new()).await;

        let result = h
            .orchestrator
            .run(
                &user(),
                GenerateParams {
                    prompt: "sharpen".to_string(),
                    mode: GenerationMode::Edit,
                    sources: vec![],
                },
            )
            .await;

        assert!(matches!(result, Err(StudioError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_save_failure_absorbed_and_not_charged() {
        let db = memory_pool().await;
        let usage = Arc::new(UsageManager::new(Arc::new(
            SqliteUsageStore::new(db).await.unwrap(),
        )));
        let orchestrator = Orchestrator::new(
            Arc::new(MockGenerator::new()),
            Arc::clone(&usage),
            Arc::new(BrokenGallery),
        );

        // The artifact is still returned even though persistence failed
        let outcome = orchestrator
            .run(
                &user(),
                GenerateParams {
                    prompt: "a fox".to_string(),
                    mode: GenerationMode::Generate,
                    sources: vec![],
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.images.len(), 1);

        // No save means no charge
        let check = usage.check_usage("user-1").await.unwrap();
        assert_eq!(check.images_generated, 0);
    }

    #[test]
    fn test_enrich_prompt_appends_directives() {
        let enriched = enrich_prompt("a fox in the snow.");
        assert!(enriched.starts_with("a fox in the snow. "));
        assert!(enriched.contains(QUALITY_DIRECTIVE));
        assert!(enriched.ends_with(ASPECT_DIRECTIVE));
    }
}
