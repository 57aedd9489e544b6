//! API Routes
//!
//! Configures the Axum router: admin endpoints plus a fallback that proxies
//! everything else.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, metrics_handler, proxy_handler, stats_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /_cache/health` - Health check endpoint
/// - `GET /_cache/stats` - Metrics snapshot
/// - `GET /_cache/metrics` - Prometheus text exposition
/// - anything else - dispatched by method to the cache-backed or
///   invalidating handler
///
/// # Middleware
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/_cache/health", get(health_handler))
        .route("/_cache/stats", get(stats_handler))
        .route("/_cache/metrics", get(metrics_handler))
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
