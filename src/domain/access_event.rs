//! Access event model for asynchronous redirect logging.

use chrono::{DateTime, Utc};

use crate::domain::fingerprint::ShortHash;

/// A redirect that should be recorded in the access log.
///
/// Created by the redirect handler and handed to
/// [`crate::domain::access_worker::run_access_worker`] through a bounded
/// channel so the redirect response never waits on the insert.
#[derive(Debug, Clone)]
pub struct AccessEvent {
    pub short_hash: ShortHash,
    pub requested_at: DateTime<Utc>,
}

impl AccessEvent {
    pub fn new(short_hash: ShortHash) -> Self {
        Self {
            short_hash,
            requested_at: Utc::now(),
        }
    }
}
