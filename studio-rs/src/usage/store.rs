//! Persistence for usage records
//!
//! Reads and writes are whole-record fetch/upsert with no transaction
//! spanning a check-then-increment sequence. Two concurrent requests can
//! therefore both pass a quota check with one unit left and both increment;
//! closing that race would take a conditional UPDATE returning the affected
//! row count instead of this interface.

use crate::error::{Result, StudioError};
use crate::usage::types::{Tier, UsageRecord, UserLevel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Storage seam for usage records
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Fetch the record for a user, if one exists
    async fn fetch(&self, user_id: &str) -> Result<Option<UsageRecord>>;

    /// Insert or replace the record for `record.user_id`
    async fn upsert(&self, record: &UsageRecord) -> Result<()>;

    /// All records (admin view)
    async fn list(&self) -> Result<Vec<UsageRecord>>;
}

/// Sqlite-backed usage store
pub struct SqliteUsageStore {
    db: SqlitePool,
}

impl SqliteUsageStore {
    /// Create the store, ensuring the table exists
    pub async fn new(db: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usage_records (
                user_id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                tier TEXT NOT NULL,
                images_generated INTEGER NOT NULL,
                period_start TEXT NOT NULL,
                period_end TEXT NOT NULL,
                user_level TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await?;

        Ok(Self { db })
    }
}

fn decode_err(msg: String) -> StudioError {
    StudioError::Database(sqlx::Error::Decode(msg.into()))
}

fn parse_timestamp(s: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| decode_err(format!("invalid {} timestamp: {}", column, e)))
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<UsageRecord> {
    let tier_str: String = row.try_get("tier")?;
    let tier = Tier::from_str(&tier_str)
        .ok_or_else(|| decode_err(format!("unknown tier: {}", tier_str)))?;

    let level_str: String = row.try_get("user_level")?;
    let user_level = UserLevel::from_str(&level_str)
        .ok_or_else(|| decode_err(format!("unknown user level: {}", level_str)))?;

    let period_start: String = row.try_get("period_start")?;
    let period_end: String = row.try_get("period_end")?;
    let images_generated: i64 = row.try_get("images_generated")?;

    Ok(UsageRecord {
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        tier,
        images_generated: images_generated.max(0) as u32,
        period_start: parse_timestamp(&period_start, "period_start")?,
        period_end: parse_timestamp(&period_end, "period_end")?,
        user_level,
    })
}

#[async_trait]
impl UsageStore for SqliteUsageStore {
    async fn fetch(&self, user_id: &str) -> Result<Option<UsageRecord>> {
        let row = sqlx::query("SELECT * FROM usage_records WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        row.map(|r| record_from_row(&r)).transpose()
    }

    async fn upsert(&self, record: &UsageRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO usage_records
                (user_id, email, tier, images_generated, period_start, period_end, user_level)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                email = excluded.email,
                tier = excluded.tier,
                images_generated = excluded.images_generated,
                period_start = excluded.period_start,
                period_end = excluded.period_end,
                user_level = excluded.user_level
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.email)
        .bind(record.tier.as_str())
        .bind(record.images_generated as i64)
        .bind(record.period_start.to_rfc3339())
        .bind(record.period_end.to_rfc3339())
        .bind(record.user_level.as_str())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<UsageRecord>> {
        let rows = sqlx::query("SELECT * FROM usage_records ORDER BY user_id")
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(record_from_row).collect()
    }
}
