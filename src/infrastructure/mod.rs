//! Infrastructure layer for external integrations.
//!
//! # Modules
//!
//! - [`connection`] - connection pooling with ping-before-use and retry
//! - [`persistence`] - storage backends

pub mod connection;
pub mod persistence;
