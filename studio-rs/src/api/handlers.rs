//! API request handlers

use axum::{extract::State, http::StatusCode, Json};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::StudioError;
use crate::gallery::ImageSummary;
use crate::generation::{GenerateParams, GeneratedImage, GenerationMode, SourceImage};
use crate::usage::{UsageCheck, UsageRecord};

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            error: msg.to_string(),
        }
    }
}

type HandlerError = (StatusCode, Json<ApiError>);

/// Map a core error to an HTTP response.
///
/// Storage and upstream failures collapse to a generic 500 so a quota-store
/// outage cannot be told apart from any other failure (the evaluator already
/// failed closed before this point).
pub(crate) fn map_error(err: StudioError) -> HandlerError {
    let status = match &err {
        StudioError::Unauthenticated => StatusCode::UNAUTHORIZED,
        StudioError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
        StudioError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        StudioError::NoResult => StatusCode::UNPROCESSABLE_ENTITY,
        _ => {
            error!("internal error: {}", err);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new("Internal server error")),
            );
        }
    };

    (status, Json(ApiError::new(&err.to_string())))
}

/// GET /health - Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/usage/check - Evaluate remaining quota for the caller
pub async fn check_usage(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<UsageCheck>, HandlerError> {
    let check = state
        .usage
        .check_usage(&user.user_id)
        .await
        .map_err(map_error)?;
    Ok(Json(check))
}

/// POST /api/usage/increment - Charge one quota unit to the caller
pub async fn increment_usage(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<UsageRecord>, HandlerError> {
    let record = state
        .usage
        .record_generation(&user.user_id, &user.email)
        .await
        .map_err(map_error)?;
    Ok(Json(record))
}

/// GET /api/usage/record - Fetch the caller's usage record, creating it if absent
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<UsageRecord>, HandlerError> {
    let record = state
        .usage
        .get_or_create(&user.user_id, &user.email)
        .await
        .map_err(map_error)?;
    Ok(Json(record))
}

/// Generate request body
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub mode: GenerationMode,
    #[serde(default)]
    pub images: Vec<SourceImage>,
}

/// Generate response
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub images: Vec<GeneratedImage>,
    pub warnings: Vec<String>,
}

/// Reject uploads whose payload is not valid base64 before any model call
fn validate_sources(sources: &[SourceImage]) -> Result<(), StudioError> {
    for source in sources {
        if BASE64.decode(&source.data).is_err() {
            return Err(StudioError::InvalidRequest(format!(
                "image {} is not valid base64",
                source.name.as_deref().unwrap_or("upload")
            )));
        }
    }
    Ok(())
}

/// POST /api/generate - Run one generation request
pub async fn generate(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, HandlerError> {
    if req.prompt.trim().is_empty() {
        return Err(map_error(StudioError::InvalidRequest(
            "prompt must not be empty".to_string(),
        )));
    }
    validate_sources(&req.images).map_err(map_error)?;

    let outcome = state
        .orchestrator
        .run(
            &user,
            GenerateParams {
                prompt: req.prompt,
                mode: req.mode,
                sources: req.images,
            },
        )
        .await
        .map_err(map_error)?;

    Ok(Json(GenerateResponse {
        images: outcome.images,
        warnings: outcome.warnings,
    }))
}

/// GET /api/images - List the caller's gallery without payloads
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<ImageSummary>>, HandlerError> {
    let summaries = state
        .gallery
        .list_for_user(&user.user_id)
        .await
        .map_err(map_error)?;
    Ok(Json(summaries))
}

/// GET /api/admin/usage - List all usage records (admin only)
pub async fn admin_list_usage(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<UsageRecord>>, HandlerError> {
    if !user.is_admin() {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::new("Admin access required")),
        ));
    }

    let records = state.usage.list_records().await.map_err(map_error)?;
    Ok(Json(records))
}
