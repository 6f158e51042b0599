//! Image generation engine abstraction
//!
//! The external model sits behind [`ImageGenerator`]; a call that produces no
//! image data is a valid `None` outcome, distinct from a transport or
//! provider error.

use crate::error::Result;
use serde::{Deserialize, Serialize};

pub mod gemini;
pub mod mock;
pub mod orchestrator;

pub use orchestrator::{GenerateParams, GenerationOutcome, Orchestrator};

/// Whether a request creates an image from scratch or edits uploaded ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Generate,
    Edit,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Generate => "generate",
            GenerationMode::Edit => "edit",
        }
    }
}

/// An uploaded input image for edit mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceImage {
    /// Base64-encoded image bytes
    pub data: String,
    pub mime_type: String,
    /// Original upload filename, if the client sent one
    pub name: Option<String>,
}

/// One call to the external model
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Enriched instruction (user prompt plus fixed directives)
    pub prompt: String,
    /// Input image for edit mode, absent for generate mode
    pub source: Option<SourceImage>,
}

/// A successful model output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Base64-encoded image bytes
    pub data: String,
    pub mime_type: String,
}

/// Image generation engine trait
#[async_trait::async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Run one generation call. `Ok(None)` means the model settled without
    /// producing image data.
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<GeneratedImage>>;

    /// Get model name
    fn model_name(&self) -> &str;
}
