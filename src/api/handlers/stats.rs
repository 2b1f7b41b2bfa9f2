//! Handlers for usage statistics.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::json;

use crate::api::dto::stats::{LinkStatsResponse, StatsQueryResponse, StatsSummaryResponse};
use crate::api::handlers::redirect::parse_short_hash;
use crate::domain::statistics::{StatsRange, StatsSubject};
use crate::error::AppError;
use crate::infrastructure::connection::Connector;
use crate::state::AppState;

/// Service-wide statistics.
///
/// # Endpoint
///
/// `GET /api/stats`
///
/// Always answers 200. Figures whose query failed are `null`.
pub async fn stats_summary_handler<C: Connector>(
    State(state): State<AppState<C>>,
) -> Json<StatsSummaryResponse> {
    Json(state.stats_service.summary().await.into())
}

/// Statistics of a single link.
///
/// # Endpoint
///
/// `GET /api/stats/{short_hash}`
///
/// Blocked links are still reported, with `blocked: true`.
pub async fn link_stats_handler<C: Connector>(
    Path(short_hash): Path<String>,
    State(state): State<AppState<C>>,
) -> Result<Json<LinkStatsResponse>, AppError> {
    let short_hash = parse_short_hash(&short_hash)?;

    let stats = state
        .stats_service
        .link_statistics(&short_hash)
        .await?
        .ok_or_else(|| {
            AppError::not_found(
                "Short link not found",
                json!({ "short_hash": short_hash.as_str() }),
            )
        })?;

    Ok(Json(stats.into()))
}

/// A single named statistics query.
///
/// # Endpoint
///
/// `GET /api/stats/{subject}/{range}`
///
/// `subject` is `links` or `redirects`. `range` is one of `today`,
/// `this_week`, `this_month`, `this_year`, `all`, `per_week`, `per_hour`,
/// `per_dow` or `per_dom`.
///
/// # Errors
///
/// - **404** for an unknown subject or range
/// - **503** if the query could not be answered
pub async fn stats_query_handler<C: Connector>(
    Path((subject, range)): Path<(String, String)>,
    State(state): State<AppState<C>>,
) -> Result<Json<StatsQueryResponse>, AppError> {
    let parsed: StatsSubject = subject.parse().map_err(|reason: String| {
        AppError::not_found("Unknown statistics subject", json!({ "reason": reason }))
    })?;

    if range.parse::<StatsRange>().is_err() {
        return Err(AppError::not_found(
            "Unknown statistics range",
            json!({ "range": range }),
        ));
    }

    let stats = state
        .stats_service
        .query(parsed, &range)
        .await
        .ok_or_else(|| {
            AppError::unavailable("Statistics are unavailable", json!({ "range": range }))
        })?;

    Ok(Json(StatsQueryResponse::new(parsed.as_str(), &range, stats)))
}
