//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the registry router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/registry/sources/new", post(handlers::register_modules))
        .route(
            "/v1/registry/sources/list",
            get(handlers::list_sources).post(handlers::missing_sources),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
