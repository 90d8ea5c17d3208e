//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/summary", get(handlers::summary))
        .route("/v1/problems", get(handlers::list_problems))
        .route("/v1/problems/{*module}", get(handlers::get_problem));

    // Module protocol paths embed slash-separated sources, so they are
    // dispatched from the fallback.
    let mut router = Router::new()
        .merge(api_routes)
        .fallback(handlers::module_fallback);

    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
