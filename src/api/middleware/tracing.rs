//! Request spans for the HTTP surface.
//!
//! Each request gets an `INFO` span carrying the method, the matched route
//! template and the path. Requests to a short-link route also record the
//! short hash, so redirects and previews can be followed per link:
//!
//! ```text
//! INFO http{method=GET route=/{short_hash} path=/3f2a short_hash=3f2a}: finished processing request latency=1 ms status=301
//! INFO http{method=POST route=/api/shorten path=/api/shorten}: finished processing request latency=9 ms status=201
//! ```

use axum::extract::MatchedPath;
use axum::http::Request;
use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, MakeSpan, TraceLayer};
use tracing::{Level, Span, field};

/// Builds the `http` span of a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let path = request.uri().path();
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str);

        let span = tracing::info_span!(
            "http",
            method = %request.method(),
            route = route.unwrap_or("-"),
            path,
            short_hash = field::Empty,
        );
        if let Some(short_hash) = route.and_then(|route| short_hash_of(route, path)) {
            span.record("short_hash", short_hash);
        }
        span
    }
}

/// Last path segment when `route` ends in the `{short_hash}` parameter.
fn short_hash_of<'p>(route: &str, path: &'p str) -> Option<&'p str> {
    if !route.ends_with("{short_hash}") {
        return None;
    }
    path.rsplit('/').next().filter(|segment| !segment.is_empty())
}

pub type HttpTraceLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan, DefaultOnRequest, DefaultOnResponse>;

/// Tracing layer used by [`crate::routes::router`].
///
/// Must be added with `Router::layer` so the matched route is known when the
/// span is created.
pub fn layer() -> HttpTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}
