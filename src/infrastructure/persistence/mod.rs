//! Storage backends implementing [`crate::domain::repositories::LinkBackend`].
//!
//! - [`PgConnector`] / [`PgLinkConnection`] - PostgreSQL via SQLx
//! - `memory` - in-memory double used by unit tests

#[cfg(test)]
pub mod memory;
pub mod pg_link_backend;

pub use pg_link_backend::{PgConnector, PgLinkConnection};
