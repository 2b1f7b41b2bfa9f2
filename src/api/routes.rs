//! API route configuration.

use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{
    link_stats_handler, shorten_handler, stats_query_handler, stats_summary_handler,
};
use crate::infrastructure::connection::Connector;
use crate::state::AppState;

/// JSON API routes, mounted under `/api`.
///
/// # Endpoints
///
/// - `POST /shorten`                  - Shorten a URL
/// - `GET  /stats`                    - Service-wide statistics
/// - `GET  /stats/{short_hash}`       - Statistics of one link
/// - `GET  /stats/{subject}/{range}`  - A single named statistics query
pub fn api_routes<C: Connector>() -> Router<AppState<C>> {
    Router::new()
        .route("/shorten", post(shorten_handler::<C>))
        .route("/stats", get(stats_summary_handler::<C>))
        .route("/stats/{short_hash}", get(link_stats_handler::<C>))
        .route("/stats/{subject}/{range}", get(stats_query_handler::<C>))
}
