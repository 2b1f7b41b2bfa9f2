//! Handlers for following and previewing short links.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::api::dto::link::LinkPreview;
use crate::application::services::Resolution;
use crate::domain::access_event::AccessEvent;
use crate::domain::fingerprint::ShortHash;
use crate::error::AppError;
use crate::infrastructure::connection::Connector;
use crate::state::AppState;

/// Redirects a short hash to its URL.
///
/// # Endpoint
///
/// `GET /{short_hash}`
///
/// # Request Flow
///
/// 1. Resolve the short hash through the link store
/// 2. Queue an access event for the background worker
/// 3. Return **301 Moved Permanently**
///
/// Access events go to a bounded channel. When the queue is full the event
/// is dropped and the redirect still succeeds.
///
/// # Errors
///
/// - **404** for unknown or malformed short hashes
/// - **410** for blocked links
/// - **503** when the database stays unreachable after all retries
pub async fn redirect_handler<C: Connector>(
    Path(short_hash): Path<String>,
    State(state): State<AppState<C>>,
) -> Result<Response, AppError> {
    let short_hash = parse_short_hash(&short_hash)?;

    let url = match state.link_service.resolve(&short_hash).await? {
        Resolution::Redirect(url) => url,
        Resolution::Blocked(entry) => return Err(blocked(&short_hash, &entry.comment)),
        Resolution::NotFound => return Err(unknown(&short_hash)),
    };

    match state.access_sender.try_send(AccessEvent::new(short_hash.clone())) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => warn!(%short_hash, "Access queue full, dropping event"),
        Err(TrySendError::Closed(_)) => warn!(%short_hash, "Access queue closed"),
    }

    debug!(%short_hash, %url, "Redirecting");
    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, url)]).into_response())
}

/// Shows where a short link points without following it.
///
/// # Endpoint
///
/// `GET /show/{short_hash}`
///
/// Does not count as an access.
pub async fn show_handler<C: Connector>(
    Path(short_hash): Path<String>,
    State(state): State<AppState<C>>,
) -> Result<Json<LinkPreview>, AppError> {
    let short_hash = parse_short_hash(&short_hash)?;
    let store = state.link_service.store();

    let link = store
        .link_details(&short_hash)
        .await?
        .ok_or_else(|| unknown(&short_hash))?;
    if let Some(entry) = store.is_blocked(&short_hash).await? {
        return Err(blocked(&short_hash, &entry.comment));
    }

    Ok(Json(LinkPreview {
        short_url: state.short_url(link.short_hash.as_str()),
        short_hash: link.short_hash.to_string(),
        url: link.url,
        created_at: link.created_at,
    }))
}

pub(crate) fn parse_short_hash(raw: &str) -> Result<ShortHash, AppError> {
    ShortHash::parse(raw).ok_or_else(|| {
        AppError::not_found("Short link not found", json!({ "short_hash": raw }))
    })
}

fn unknown(short_hash: &ShortHash) -> AppError {
    AppError::not_found(
        "Short link not found",
        json!({ "short_hash": short_hash.as_str() }),
    )
}

fn blocked(short_hash: &ShortHash, comment: &str) -> AppError {
    AppError::gone(
        "Short link has been blocked",
        json!({ "short_hash": short_hash.as_str(), "comment": comment }),
    )
}
