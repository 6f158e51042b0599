use crate::error::{Result, StudioError};
use crate::usage::store::UsageStore;
use crate::usage::types::{UsageCheck, UsageRecord};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Usage evaluation and metering over a [`UsageStore`]
pub struct UsageManager {
    store: Arc<dyn UsageStore>,
}

impl UsageManager {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        UsageManager { store }
    }

    /// Evaluate whether a user may generate another image.
    ///
    /// A user with no record is treated as a fresh free-tier user; the record
    /// itself is created later, on first increment or get-or-create. An
    /// expired period is rolled over and persisted as part of the check.
    pub async fn check_usage(&self, user_id: &str) -> Result<UsageCheck> {
        if user_id.is_empty() {
            return Err(StudioError::InvalidRequest("missing user id".to_string()));
        }

        let Some(mut record) = self.store.fetch(user_id).await? else {
            debug!(user_id, "no usage record, treating as new free-tier user");
            return Ok(UsageCheck::new_user());
        };

        let now = Utc::now();
        if record.period_expired(now) {
            info!(user_id, "usage period expired, rolling over");
            record.rollover(now);
            self.store.upsert(&record).await?;
        }

        Ok(UsageCheck::from_record(&record))
    }

    /// Fetch the user's record, creating a zeroed free-tier one if absent
    pub async fn get_or_create(&self, user_id: &str, email: &str) -> Result<UsageRecord> {
        if user_id.is_empty() {
            return Err(StudioError::InvalidRequest("missing user id".to_string()));
        }

        if let Some(record) = self.store.fetch(user_id).await? {
            return Ok(record);
        }

        let record = UsageRecord::new(user_id.to_string(), email.to_string(), Utc::now());
        self.store.upsert(&record).await?;
        Ok(record)
    }

    /// Charge one quota unit for a successfully persisted image.
    ///
    /// Applies the same rollover rule as the check: an expired period resets
    /// to a counter of 1 rather than incrementing the stale value.
    pub async fn record_generation(&self, user_id: &str, email: &str) -> Result<UsageRecord> {
        if user_id.is_empty() {
            return Err(StudioError::InvalidRequest("missing user id".to_string()));
        }

        let now = Utc::now();
        let mut record = match self.store.fetch(user_id).await? {
            Some(record) => record,
            None => {
                debug!(user_id, "creating usage record on first increment");
                UsageRecord::new(user_id.to_string(), email.to_string(), now)
            }
        };

        if record.period_expired(now) {
            info!(user_id, "usage period expired, rolling over on increment");
            record.rollover(now);
        }
        record.images_generated += 1;

        self.store.upsert(&record).await?;
        debug!(
            user_id,
            images_generated = record.images_generated,
            "usage incremented"
        );
        Ok(record)
    }

    /// All usage records (admin view)
    pub async fn list_records(&self) -> Result<Vec<UsageRecord>> {
        self.store.list().await
    }
}
