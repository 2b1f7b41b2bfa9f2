//! Per-connection storage primitives behind the link store.

use async_trait::async_trait;

use crate::domain::entities::{BlockEntry, Link};
use crate::domain::fingerprint::{FullHash, ShortHash};
use crate::domain::statistics::{Statistics, StatsRange, StatsSubject, Timespan};
use crate::error::BackendError;

/// Result of an attempted link insertion.
///
/// The uniqueness constraints on `short_hash` and `full_hash` are the only
/// arbiter between concurrent writers; callers react to the outcome instead
/// of checking first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The candidate short hash already belongs to another link.
    ShortHashTaken,
    /// A link for this fingerprint already exists. Reported even when the
    /// short hash clashes as well.
    FullHashTaken,
}

/// A single live connection to the link database.
///
/// Arguments are taken by value so the returned futures only borrow the
/// connection itself; see [`crate::infrastructure::connection::ConnectionManager::run`].
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkConnection`] - PostgreSQL
/// - an in-memory double under `cfg(test)`
///
/// # Errors
///
/// Every method reports [`BackendError::ConnectionLost`] when the server
/// went away, and [`BackendError::Query`] for anything else.
#[async_trait]
pub trait LinkBackend: Send {
    /// Round-trips to the server to prove the connection is usable.
    async fn ping(&mut self) -> Result<(), BackendError>;

    async fn insert_link(
        &mut self,
        short_hash: ShortHash,
        full_hash: FullHash,
        url: String,
    ) -> Result<InsertOutcome, BackendError>;

    async fn link_by_full_hash(&mut self, full_hash: FullHash)
    -> Result<Option<Link>, BackendError>;

    async fn link_by_short_hash(
        &mut self,
        short_hash: ShortHash,
    ) -> Result<Option<Link>, BackendError>;

    async fn block_entry(&mut self, short_hash: ShortHash)
    -> Result<Option<BlockEntry>, BackendError>;

    /// Blocks a link. Returns `false` if no such link exists. Blocking an
    /// already blocked link keeps the first comment.
    async fn insert_block(
        &mut self,
        short_hash: ShortHash,
        comment: String,
    ) -> Result<bool, BackendError>;

    /// Appends an access event. Returns `false` if no such link exists.
    async fn insert_access(&mut self, short_hash: ShortHash) -> Result<bool, BackendError>;

    /// Number of recorded redirects, or `None` for an unknown link.
    async fn redirect_count(&mut self, short_hash: ShortHash)
    -> Result<Option<i64>, BackendError>;

    async fn statistics(
        &mut self,
        subject: StatsSubject,
        range: StatsRange,
    ) -> Result<Statistics, BackendError>;

    async fn timespan(&mut self, subject: StatsSubject) -> Result<Timespan, BackendError>;

    async fn redirect_timespan(&mut self, short_hash: ShortHash)
    -> Result<Timespan, BackendError>;
}
