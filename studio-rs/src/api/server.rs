//! API Server - HTTP server for the studio REST API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::{handlers, AppState};

/// API Server configuration
pub struct ApiServer {
    state: Arc<AppState>,
    addr: String,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: Arc<AppState>, addr: String) -> Self {
        Self { state, addr }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        // CORS configuration: the browser front-end is served elsewhere
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        // Public routes (no auth required)
        let public_routes = Router::new().route("/health", get(handlers::health));

        // Authenticated routes; identity comes from the bearer-token extractor
        let api_routes = Router::new()
            .route("/usage/check", get(handlers::check_usage))
            .route("/usage/increment", post(handlers::increment_usage))
            .route("/usage/record", get(handlers::get_usage))
            .route("/generate", post(handlers::generate))
            .route("/images", get(handlers::list_images))
            .route("/admin/usage", get(handlers::admin_list_usage));

        Router::new()
            .merge(public_routes)
            .nest("/api", api_routes)
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Start the API server
    pub async fn run(&self) -> std::io::Result<()> {
        let router = self.router();

        info!("Starting API server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
