//! Core domain entities.
//!
//! - [`Link`] - a short hash bound to a URL
//! - [`BlockEntry`] - an administrative block on a link
//!
//! Access events are not modelled as entities; they are only ever counted.
//! See [`crate::domain::statistics`].

pub mod block;
pub mod link;

pub use block::BlockEntry;
pub use link::Link;
