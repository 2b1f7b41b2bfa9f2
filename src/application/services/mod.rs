//! Business logic services for the application layer.

pub mod link_service;
pub mod link_store;
pub mod stats_service;

pub use link_service::{LinkService, Resolution, Shortened};
pub use link_store::LinkStore;
pub use stats_service::{LinkStatistics, PeriodCounts, StatsService, StatsSummary};
