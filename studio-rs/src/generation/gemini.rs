//! Gemini image generation engine

use crate::error::{Result, StudioError};
use crate::generation::{GeneratedImage, GenerationRequest, ImageGenerator};
use serde::{Deserialize, Serialize};
use tracing::debug;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini-backed [`ImageGenerator`]
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// Create from an environment variable holding the API key
    pub fn from_env(api_key_env: &str, model: String) -> Result<Self> {
        let api_key = std::env::var(api_key_env)
            .map_err(|_| StudioError::Config(format!("{} not set", api_key_env)))?;
        Ok(Self::new(api_key, model))
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

impl GeminiRequest {
    fn from_generation_request(request: &GenerationRequest) -> Self {
        let mut parts = vec![RequestPart {
            text: Some(request.prompt.clone()),
            inline_data: None,
        }];

        if let Some(source) = &request.source {
            parts.push(RequestPart {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: source.mime_type.clone(),
                    data: source.data.clone(),
                }),
            });
        }

        GeminiRequest {
            contents: vec![Content { parts }],
        }
    }
}

#[async_trait::async_trait]
impl ImageGenerator for GeminiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Option<GeneratedImage>> {
        let url = format!("{}/{}:generateContent", API_BASE, self.model);
        let body = GeminiRequest::from_generation_request(request);

        debug!(model = %self.model, edit = request.source.is_some(), "calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StudioError::Generation(format!(
                "Gemini returned {}: {}",
                status, text
            )));
        }

        let parsed: GeminiResponse = response.json().await?;

        // A settled response with no inline image part is a valid
        // no-result outcome, not an error
        let image = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data);

        Ok(image.map(|data| GeneratedImage {
            data: data.data,
            mime_type: data.mime_type,
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
