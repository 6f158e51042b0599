use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Monthly image limit of {limit} reached. Upgrade your plan to generate more images.")]
    QuotaExceeded { limit: u32 },

    #[error("The model returned no image. Try rephrasing your prompt.")]
    NoResult,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StudioError>;
