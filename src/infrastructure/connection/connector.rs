use async_trait::async_trait;

use crate::domain::repositories::LinkBackend;
use crate::error::BackendError;

/// Opens fresh connections for the [`super::ConnectionManager`].
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: LinkBackend + 'static;

    /// Opens and initializes a new connection.
    ///
    /// # Errors
    ///
    /// [`BackendError::ConnectionLost`] when the server cannot be reached;
    /// other variants are treated as permanent by the caller.
    async fn connect(&self) -> Result<Self::Connection, BackendError>;
}
