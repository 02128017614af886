//! Route definitions for the API.

use axum::{routing::get, Router};

use super::handlers;
use super::SharedState;

/// Create the main API router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        // Health endpoints (no code required)
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        // Download redemption surface
        .nest("/download", handlers::download::router())
        .with_state(state)
}
