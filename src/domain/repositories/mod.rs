//! Storage trait definitions for the domain layer.
//!
//! Implementations live in [`crate::infrastructure::persistence`].

pub mod link_backend;

pub use link_backend::{InsertOutcome, LinkBackend};
