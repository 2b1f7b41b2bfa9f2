//! DTO for the link preview endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a short link points to, shown instead of redirecting.
#[derive(Debug, Serialize)]
pub struct LinkPreview {
    pub short_hash: String,
    pub short_url: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}
