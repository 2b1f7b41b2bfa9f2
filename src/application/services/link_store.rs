//! Durable mapping between fingerprints, short hashes and URLs.
//!
//! # Short hash allocation
//!
//! A new link receives the shortest prefix of its fingerprint, at least
//! `min_short_hash_len` characters long, that no other link uses yet:
//!
//! ```text
//! full hash  9f86d081884c7d659a2feaa0c55ad015a3bf4f1b
//! try        9f86       -> taken by another link
//! try        9f86d      -> inserted
//! ```
//!
//! The database's uniqueness constraints decide every race. Losing on the
//! short hash moves on to the next prefix; losing on the full hash means
//! somebody else stored the same URL first, and their short hash is returned.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::entities::{BlockEntry, Link};
use crate::domain::fingerprint::{FULL_HASH_LEN, FullHash, ShortHash};
use crate::domain::repositories::{InsertOutcome, LinkBackend};
use crate::domain::statistics::{Statistics, StatsRange, StatsSubject, Timespan};
use crate::error::LinkError;
use crate::infrastructure::connection::{ConnectionManager, Connector};

/// Default minimum short hash length.
pub const DEFAULT_MIN_SHORT_HASH_LEN: usize = 4;

/// Link persistence on top of a [`ConnectionManager`].
pub struct LinkStore<C: Connector> {
    connections: Arc<ConnectionManager<C>>,
    min_short_hash_len: usize,
}

impl<C: Connector> LinkStore<C> {
    /// Creates a store. A minimum length of 0 falls back to the default; larger
    /// values are capped at the full hash length.
    pub fn new(connections: Arc<ConnectionManager<C>>, min_short_hash_len: usize) -> Self {
        let min_short_hash_len = match min_short_hash_len {
            0 => DEFAULT_MIN_SHORT_HASH_LEN,
            n => n.min(FULL_HASH_LEN),
        };
        Self {
            connections,
            min_short_hash_len,
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionManager<C>> {
        &self.connections
    }

    pub fn min_short_hash_len(&self) -> usize {
        self.min_short_hash_len
    }

    /// Short hash already assigned to `full_hash`, if any.
    pub async fn find_by_full_hash(
        &self,
        full_hash: &FullHash,
    ) -> Result<Option<ShortHash>, LinkError> {
        let link = self
            .connections
            .run(|conn| conn.link_by_full_hash(full_hash.clone()))
            .await?;
        Ok(link.map(|link| link.short_hash))
    }

    /// URL behind `short_hash`, if any. Does not consult the block list.
    pub async fn find_by_short_hash(
        &self,
        short_hash: &ShortHash,
    ) -> Result<Option<String>, LinkError> {
        let link = self
            .connections
            .run(|conn| conn.link_by_short_hash(short_hash.clone()))
            .await?;
        Ok(link.map(|link| link.url))
    }

    /// URL stored for `full_hash`, if any.
    pub async fn url_for_full_hash(&self, full_hash: &FullHash) -> Result<Option<String>, LinkError> {
        let link = self
            .connections
            .run(|conn| conn.link_by_full_hash(full_hash.clone()))
            .await?;
        Ok(link.map(|link| link.url))
    }

    /// Returns `true` if `full_hash` is already bound to a URL other than
    /// `candidate_url`. An unknown fingerprint is not a collision.
    pub async fn detect_collision(
        &self,
        full_hash: &FullHash,
        candidate_url: &str,
    ) -> Result<bool, LinkError> {
        let stored = self.url_for_full_hash(full_hash).await?;
        Ok(stored.is_some_and(|url| url != candidate_url))
    }

    /// Stores `url` under the shortest free prefix of `full_hash`.
    ///
    /// Calling this again for a URL that is already stored returns the
    /// existing short hash, so replays after a lost connection are harmless.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Collision`] if `full_hash` is bound to a different URL
    /// - [`LinkError::Store`] if every prefix up to the full hash is taken
    /// - [`LinkError::Connection`] if the database stays unreachable
    pub async fn allocate(&self, full_hash: &FullHash, url: &str) -> Result<ShortHash, LinkError> {
        for len in self.min_short_hash_len..=FULL_HASH_LEN {
            let candidate = full_hash.prefix(len);

            let outcome = self
                .connections
                .run(|conn| conn.insert_link(candidate.clone(), full_hash.clone(), url.to_owned()))
                .await?;

            match outcome {
                InsertOutcome::Inserted => {
                    info!(short_hash = %candidate, %full_hash, "Link created");
                    return Ok(candidate);
                }
                InsertOutcome::ShortHashTaken => {
                    debug!(short_hash = %candidate, "Prefix taken, extending");
                }
                InsertOutcome::FullHashTaken => {
                    return self.existing_allocation(full_hash, url).await;
                }
            }
        }

        warn!(%full_hash, "Every prefix of the fingerprint is taken");
        Err(LinkError::Store(format!(
            "no free prefix left for fingerprint {full_hash}"
        )))
    }

    async fn existing_allocation(
        &self,
        full_hash: &FullHash,
        url: &str,
    ) -> Result<ShortHash, LinkError> {
        let link = self
            .connections
            .run(|conn| conn.link_by_full_hash(full_hash.clone()))
            .await?
            .ok_or_else(|| {
                LinkError::Store(format!("fingerprint {full_hash} vanished after conflict"))
            })?;

        if link.url != url {
            return Err(LinkError::Collision {
                full_hash: full_hash.clone(),
                url: url.to_owned(),
            });
        }

        debug!(short_hash = %link.short_hash, "Link already stored");
        Ok(link.short_hash)
    }

    /// Block entry of `short_hash`, or `None` if the link is not blocked.
    pub async fn is_blocked(&self, short_hash: &ShortHash) -> Result<Option<BlockEntry>, LinkError> {
        self.connections
            .run(|conn| conn.block_entry(short_hash.clone()))
            .await
    }

    /// Blocks a link. Returns `false` if the link does not exist.
    pub async fn block(&self, short_hash: &ShortHash, comment: &str) -> Result<bool, LinkError> {
        let blocked = self
            .connections
            .run(|conn| conn.insert_block(short_hash.clone(), comment.to_owned()))
            .await?;
        if blocked {
            info!(%short_hash, "Link blocked");
        }
        Ok(blocked)
    }

    pub async fn link_details(&self, short_hash: &ShortHash) -> Result<Option<Link>, LinkError> {
        self.connections
            .run(|conn| conn.link_by_short_hash(short_hash.clone()))
            .await
    }

    /// Number of recorded redirects, or `None` for an unknown link.
    pub async fn redirect_count(&self, short_hash: &ShortHash) -> Result<Option<i64>, LinkError> {
        self.connections
            .run(|conn| conn.redirect_count(short_hash.clone()))
            .await
    }

    /// Appends an access event for `short_hash`.
    ///
    /// Best effort: failures are logged and swallowed.
    pub async fn record_access(&self, short_hash: &ShortHash) {
        match self
            .connections
            .run(|conn| conn.insert_access(short_hash.clone()))
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(%short_hash, "Access for unknown link ignored"),
            Err(e) => warn!(%short_hash, error = %e, "Failed to record access"),
        }
    }

    /// Counts `subject` over the named range.
    ///
    /// Returns `None` when the range name is unknown or the query fails.
    pub async fn get_statistics(&self, subject: StatsSubject, range: &str) -> Option<Statistics> {
        let range = match range.parse::<StatsRange>() {
            Ok(range) => range,
            Err(reason) => {
                debug!(%reason, "Statistics request rejected");
                return None;
            }
        };

        self.connections
            .run(|conn| conn.statistics(subject, range))
            .await
            .inspect_err(|e| warn!(?subject, range = range.as_str(), error = %e, "Statistics query failed"))
            .ok()
    }

    /// First and last timestamps of `subject`, or `None` if the query fails.
    pub async fn timespan(&self, subject: StatsSubject) -> Option<Timespan> {
        self.connections
            .run(|conn| conn.timespan(subject))
            .await
            .inspect_err(|e| warn!(?subject, error = %e, "Timespan query failed"))
            .ok()
    }

    /// First and last redirect of one link, or `None` if the query fails.
    pub async fn redirect_timespan(&self, short_hash: &ShortHash) -> Option<Timespan> {
        self.connections
            .run(|conn| conn.redirect_timespan(short_hash.clone()))
            .await
            .inspect_err(|e| warn!(%short_hash, error = %e, "Timespan query failed"))
            .ok()
    }
}
