//! Administrative block entries.

use chrono::{DateTime, Utc};

use crate::domain::fingerprint::ShortHash;

/// Marks a link as blocked. Blocked links are never redirected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntry {
    pub link_id: i64,
    pub short_hash: ShortHash,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
