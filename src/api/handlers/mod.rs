//! HTTP request handlers for API endpoints.
//!
//! Handlers are generic over the storage [`Connector`](crate::infrastructure::connection::Connector)
//! and are mounted with a concrete one by [`crate::routes::app_router`].

pub mod health;
pub mod redirect;
pub mod shorten;
pub mod stats;

pub use health::health_handler;
pub use redirect::{redirect_handler, show_handler};
pub use shorten::shorten_handler;
pub use stats::{link_stats_handler, stats_query_handler, stats_summary_handler};
