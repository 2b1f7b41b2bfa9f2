//! Domain layer: hashes, entities, storage contracts and statistics vocabulary.
//!
//! # Modules
//!
//! - [`fingerprint`] - URL fingerprints and short hashes
//! - [`entities`] - stored data structures
//! - [`repositories`] - per-connection storage trait
//! - [`statistics`] - statistics ranges and results
//! - [`access_event`] / [`access_worker`] - asynchronous access logging
//!
//! # Access Logging Flow
//!
//! 1. The redirect handler resolves a short hash
//! 2. An [`access_event::AccessEvent`] is pushed onto a bounded channel
//! 3. [`access_worker::run_access_worker`] drains it and records the access

pub mod access_event;
pub mod access_worker;
pub mod entities;
pub mod fingerprint;
pub mod repositories;
pub mod statistics;
