//! Usage metering for image generation
//!
//! This module tracks per-user generation counts against tiered monthly
//! limits:
//! - Evaluation of remaining quota, including period-expiry rollover
//! - Charging one quota unit per successfully persisted image

pub mod manager;
pub mod store;
pub mod types;

pub use manager::UsageManager;
pub use store::{SqliteUsageStore, UsageStore};
pub use types::{Tier, UsageCheck, UsageRecord, UserLevel};
