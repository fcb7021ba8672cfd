//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // The browser frontend is served from another origin during development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Proxy endpoints
        .route("/stac/search", get(handlers::search_stac))
        .route("/stac/scenes", get(handlers::list_scenes))
        .route("/wtss/time_series", get(handlers::time_series))
        .route("/wtss/attributes", get(handlers::coverage_attributes))
        .route("/geocode", get(handlers::geocode))
        // Comparison sessions
        .route("/comparisons", post(handlers::create_comparison))
        .route("/comparisons/{comparison_id}", get(handlers::get_comparison))
        .route("/comparisons/{comparison_id}", delete(handlers::delete_comparison))
        .route(
            "/comparisons/{comparison_id}/events",
            get(handlers::stream_comparison_events),
        )
        .route(
            "/comparisons/{comparison_id}/export",
            get(handlers::export_comparison),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::upstream::LocalDataCubeClient;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let state = AppState::new(
            Arc::new(LocalDataCubeClient::with_sample_data()),
            AppConfig::default(),
        );
        let _router = create_router(state);
    }
}
