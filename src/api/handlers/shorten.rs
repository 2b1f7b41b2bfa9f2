//! Handler for link shortening endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::infrastructure::connection::Connector;
use crate::state::AppState;

/// Shortens a URL.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "example.com/some/page" }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "short_hash": "3f2a",
///   "short_url": "https://yaturl.net/3f2a",
///   "url": "http://example.com/some/page",
///   "created": true
/// }
/// ```
///
/// **201 Created** for a new link, **200 OK** when the URL was already known.
///
/// # Errors
///
/// - **400** for URLs that cannot be normalized or encoded
/// - **500** with code `hash_collision` if the fingerprint belongs to another URL
/// - **503** when the database stays unreachable after all retries
pub async fn shorten_handler<C: Connector>(
    State(state): State<AppState<C>>,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    let shortened = state.link_service.shorten(&payload.url).await?;

    let status = if shortened.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    let short_hash = shortened.short_hash.to_string();
    Ok((
        status,
        Json(ShortenResponse {
            short_url: state.short_url(&short_hash),
            short_hash,
            url: shortened.url,
            created: shortened.created,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use axum::{Router, routing::post};
    use axum_test::TestServer;
    use serde_json::json;

    use super::*;
    use crate::api::handlers::test_support::{BASE_URL, memory_state};
    use crate::infrastructure::persistence::memory::{MemoryConnector, MemoryDatabase};

    fn server(db: &MemoryDatabase) -> TestServer {
        let (state, _rx) = memory_state(db);
        let app = Router::new()
            .route("/api/shorten", post(shorten_handler::<MemoryConnector>))
            .with_state(state);
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_shorten_creates_link() {
        let db = MemoryDatabase::new();
        let server = server(&db);

        let response = server
            .post("/api/shorten")
            .json(&json!({ "url": "Example.com/page" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<serde_json::Value>();
        let short_hash = body["short_hash"].as_str().unwrap();
        assert_eq!(short_hash.len(), 4);
        assert_eq!(body["url"], "http://example.com/page");
        assert_eq!(body["short_url"], format!("{BASE_URL}/{short_hash}"));
        assert_eq!(body["created"], true);
    }

    #[tokio::test]
    async fn test_shorten_existing_url_returns_ok() {
        let db = MemoryDatabase::new();
        let server = server(&db);
        let request = json!({ "url": "http://example.com/page" });

        let first = server.post("/api/shorten").json(&request).await;
        let second = server.post("/api/shorten").json(&request).await;

        second.assert_status_ok();
        assert_eq!(
            first.json::<serde_json::Value>()["short_hash"],
            second.json::<serde_json::Value>()["short_hash"]
        );
        assert_eq!(second.json::<serde_json::Value>()["created"], false);
        assert_eq!(db.links().len(), 1);
    }

    #[tokio::test]
    async fn test_shorten_rejects_self_reference() {
        let db = MemoryDatabase::new();
        let server = server(&db);

        let response = server
            .post("/api/shorten")
            .json(&json!({ "url": "https://yaturl.test/abcd" }))
            .await;

        response.assert_status_bad_request();
        assert_eq!(
            response.json::<serde_json::Value>()["error"]["code"],
            "validation_error"
        );
    }

    #[tokio::test]
    async fn test_shorten_during_outage_is_unavailable() {
        let db = MemoryDatabase::new();
        let server = server(&db);
        db.refuse_connects(true);

        let response = server
            .post("/api/shorten")
            .json(&json!({ "url": "http://example.com/" }))
            .await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["error"]["code"], "database_unavailable");
        assert_eq!(body["error"]["details"]["attempts"], 3);
    }
}
