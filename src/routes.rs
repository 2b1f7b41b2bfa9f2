//! Top-level router.
//!
//! # Route Structure
//!
//! - `GET  /{short_hash}`       - Follow a short link (301)
//! - `GET  /show/{short_hash}`  - Preview a short link
//! - `GET  /health`             - Health check: database, access queue, pool
//! - `/api/*`                   - JSON API
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Path normalization** - Trailing slash handling

use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

use crate::api;
use crate::api::handlers::{health_handler, redirect_handler, show_handler};
use crate::api::middleware::tracing;
use crate::infrastructure::connection::Connector;
use crate::state::AppState;

/// Constructs the application router with all routes and middleware.
pub fn app_router<C: Connector>(state: AppState<C>) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

/// All routes with tracing, before path normalization.
pub fn router<C: Connector>(state: AppState<C>) -> Router {
    Router::new()
        .route("/{short_hash}", get(redirect_handler::<C>))
        .route("/show/{short_hash}", get(show_handler::<C>))
        .route("/health", get(health_handler::<C>))
        .nest("/api", api::routes::api_routes())
        .with_state(state)
        .layer(tracing::layer())
}
