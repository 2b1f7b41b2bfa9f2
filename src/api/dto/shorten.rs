//! DTOs for the link shortening endpoint.

use serde::{Deserialize, Serialize};

/// Request to shorten a URL.
#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub short_hash: String,
    pub short_url: String,
    /// Normalized form of the submitted URL.
    pub url: String,
    /// `false` when the URL had already been shortened.
    pub created: bool,
}
