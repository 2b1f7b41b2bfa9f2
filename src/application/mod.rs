//! Application layer: link storage and the services built on it.
//!
//! - [`services::LinkStore`] - allocation, lookups, blocks, access log, statistics
//! - [`services::LinkService`] - normalize, fingerprint and shorten; resolve
//! - [`services::StatsService`] - summaries for the HTTP and admin surfaces

pub mod services;
