//! studio-rs: Metered image generation backend
//!
//! The service behind a browser-based image editing/generation product.
//! Users describe or upload images, an external generative model produces
//! results, and a metered-usage layer gates access by subscription tier.
//!
//! # Features
//!
//! - **Usage metering**: per-user monthly quotas with period rollover
//! - **Generation workflow**: quota gate, concurrent per-image edit calls,
//!   partial-failure reporting, best-effort persistence
//! - **Gallery**: sqlite-backed storage of generated images
//! - **HTTP API**: axum endpoints with JWT bearer authentication
//!
//! # Example
//!
//! ```no_run
//! use studio_rs::auth::AuthUser;
//! use studio_rs::gallery::SqliteGalleryStore;
//! use studio_rs::generation::mock::MockGenerator;
//! use studio_rs::generation::{GenerateParams, GenerationMode, Orchestrator};
//! use studio_rs::usage::{SqliteUsageStore, UsageManager};
//! use studio_rs::usage::types::UserLevel;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = sqlx::SqlitePool::connect("sqlite::memory:").await?;
//!     let usage = Arc::new(UsageManager::new(Arc::new(
//!         SqliteUsageStore::new(db.clone()).await?,
//!     )));
//!     let gallery = Arc::new(SqliteGalleryStore::new(db).await?);
//!     let orchestrator =
//!         Orchestrator::new(Arc::new(MockGenerator::new()), usage, gallery);
//!
//!     let user = AuthUser {
//!         user_id: "user-1".to_string(),
//!         email: "user-1@example.com".to_string(),
//!         level: UserLevel::User,
//!     };
//!     let outcome = orchestrator
//!         .run(
//!             &user,
//!             GenerateParams {
//!                 prompt: "a lighthouse at dusk".to_string(),
//!                 mode: GenerationMode::Generate,
//!                 sources: vec![],
//!             },
//!         )
//!         .await?;
//!     println!("{} image(s) generated", outcome.images.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`auth`]: JWT validation and explicit identity
//! - [`usage`]: Quota evaluation and metering
//! - [`generation`]: Engine abstraction and the request workflow
//! - [`gallery`]: Image persistence
//! - [`api`]: HTTP surface

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gallery;
pub mod generation;
pub mod usage;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, StudioError};
