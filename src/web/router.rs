//! Route definitions for the web server.

use axum::{
    routing::{get, patch},
    Router,
};

use super::api;
use super::server::AppState;

/// Create the API router.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route(
            "/memories",
            get(api::list_memories).post(api::create_memory),
        )
        .route(
            "/memories/:id",
            patch(api::update_memory).delete(api::delete_memory),
        )
}

/// Create the full app router.
pub fn create_app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", create_api_router())
        .route("/media/o/:path", get(api::fetch_media))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
