//! Router configuration for the HTTP surface.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::validation::MAX_FILE_BYTES;

use super::handlers;
use super::AppState;

/// Room for the 50 MiB payload plus multipart framing.
const BODY_LIMIT: usize = MAX_FILE_BYTES + 64 * 1024;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/upload", post(handlers::upload))
        .route("/api/status/:id", get(handlers::status))
        .route("/api/health", get(handlers::health))
        .route("/api/openapi", get(handlers::openapi))
        // Admin surface
        .route("/api/admin/stats", get(handlers::stats))
        .route("/api/admin/jobs", get(handlers::list_jobs))
        .route(
            "/api/admin/jobs/:id",
            get(handlers::get_job)
                .delete(handlers::delete_job)
                .patch(handlers::patch_job),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
