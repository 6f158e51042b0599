use crate::generation::GenerationMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A generated image persisted to a user's gallery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredImage {
    pub id: String,
    pub user_id: String,
    /// The user's original prompt, without the appended directives
    pub prompt: String,
    pub mode: GenerationMode,
    pub mime_type: String,
    /// Upload filename of the source image, edit mode only
    pub original_name: Option<String>,
    /// Base64-encoded image bytes
    pub data: String,
    pub created_at: DateTime<Utc>,
}

/// Gallery listing entry without the image payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    pub id: String,
    pub prompt: String,
    pub mode: GenerationMode,
    pub mime_type: String,
    pub original_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serializes_lowercase() {
        let summary = ImageSummary {
            id: "img-1".to_string(),
            prompt: "a fox".to_string(),
            mode: GenerationMode::Edit,
            mime_type: "image/png".to_string(),
            original_name: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["mode"], "edit");
    }
}
