//! HTTP API for the image studio backend

pub mod handlers;
pub mod server;

pub use server::ApiServer;

use crate::auth::{AuthUser, JwtConfig};
use crate::error::StudioError;
use crate::gallery::GalleryStore;
use crate::generation::Orchestrator;
use crate::usage::UsageManager;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    Json,
};
use handlers::ApiError;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub usage: Arc<UsageManager>,
    pub gallery: Arc<dyn GalleryStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub jwt_config: JwtConfig,
}

fn unauthenticated() -> (StatusCode, Json<ApiError>) {
    handlers::map_error(StudioError::Unauthenticated)
}

/// Extract the authenticated identity from the bearer token.
///
/// Handlers take the resulting [`AuthUser`] as an explicit parameter; nothing
/// downstream reads session state on its own.
#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(unauthenticated)?;

        let claims = state
            .jwt_config
            .validate_token(token)
            .map_err(|_| unauthenticated())?;

        Ok(AuthUser::from(claims))
    }
}
