//! Connection management with ping-before-use and bounded retry.
//!
//! - [`Connector`] - opens new connections to a concrete backend
//! - [`ConnectionManager`] - pools connections and hides transient outages
//! - [`PooledConnection`] - a checked-out connection, returned on release

pub mod connector;
pub mod manager;

use std::future::Future;
use std::pin::Pin;

pub use connector::Connector;
pub use manager::{ConnectionManager, PoolSettings, PoolStatus, PooledConnection};

/// Boxed future borrowing a connection for `'a`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
