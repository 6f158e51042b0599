use crate::error::{Result, StudioError};
use crate::gallery::types::{ImageSummary, StoredImage};
use crate::generation::GenerationMode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

/// Durable storage seam for generated images
#[async_trait]
pub trait GalleryStore: Send + Sync {
    /// Persist one generated image
    async fn save_image(&self, image: &StoredImage) -> Result<()>;

    /// List a user's images, newest first, without payload data
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ImageSummary>>;

    /// Fetch one image with its payload
    async fn fetch(&self, user_id: &str, image_id: &str) -> Result<Option<StoredImage>>;
}

/// Sqlite-backed gallery store
pub struct SqliteGalleryStore {
    db: SqlitePool,
}

impl SqliteGalleryStore {
    /// Create the store, ensuring the table exists
    pub async fn new(db: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS images (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                prompt TEXT NOT NULL,
                mode TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                original_name TEXT,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
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

fn parse_mode(s: &str) -> Result<GenerationMode> {
    match s {
        "generate" => Ok(GenerationMode::Generate),
        "edit" => Ok(GenerationMode::Edit),
        other => Err(decode_err(format!("unknown generation mode: {}", other))),
    }
}

fn parse_created_at(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| decode_err(format!("invalid created_at timestamp: {}", e)))
}

fn summary_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ImageSummary> {
    let mode: String = row.try_get("mode")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(ImageSummary {
        id: row.try_get("id")?,
        prompt: row.try_get("prompt")?,
        mode: parse_mode(&mode)?,
        mime_type: row.try_get("mime_type")?,
        original_name: row.try_get("original_name")?,
        created_at: parse_created_at(&created_at)?,
    })
}

#[async_trait]
impl GalleryStore for SqliteGalleryStore {
    async fn save_image(&self, image: &StoredImage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO images
                (id, user_id, prompt, mode, mime_type, original_name, data, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&image.id)
        .bind(&image.user_id)
        .bind(&image.prompt)
        .bind(image.mode.as_str())
        .bind(&image.mime_type)
        .bind(&image.original_name)
        .bind(&image.data)
        .bind(image.created_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ImageSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, prompt, mode, mime_type, original_name, created_at
            FROM images
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    async fn fetch(&self, user_id: &str, image_id: &str) -> Result<Option<StoredImage>> {
        let row = sqlx::query("SELECT * FROM images WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(image_id)
            .fetch_optional(&self.db)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mode: String = row.try_get("mode")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(Some(StoredImage {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            prompt: row.try_get("prompt")?,
            mode: parse_mode(&mode)?,
            mime_type: row.try_get("mime_type")?,
            original_name: row.try_get("original_name")?,
            data: row.try_get("data")?,
            created_at: parse_created_at(&created_at)?,
        }))
    }
}
