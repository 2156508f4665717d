use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// System Router Module
///
/// Unversioned endpoints used by humans and load balancers to check the process is up.
pub fn system_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Status banner with the current server timestamp.
        .route("/", get(handlers::server_status))
        // GET /health
        // Plain-text health check for load balancers.
        .route("/health", get(|| async { "ok" }))
}
