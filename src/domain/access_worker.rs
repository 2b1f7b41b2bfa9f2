//! Background worker draining the access event queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::application::services::LinkStore;
use crate::domain::access_event::AccessEvent;
use crate::infrastructure::connection::Connector;

/// Records every queued access event until all senders are dropped.
///
/// Failures are logged by [`LinkStore::record_access`] and never stop the loop.
pub async fn run_access_worker<C: Connector>(
    mut rx: mpsc::Receiver<AccessEvent>,
    store: Arc<LinkStore<C>>,
) {
    while let Some(event) = rx.recv().await {
        let lag = chrono::Utc::now() - event.requested_at;
        debug!(short_hash = %event.short_hash, lag_ms = lag.num_milliseconds(), "Recording access");
        store.record_access(&event.short_hash).await;
    }
    info!("Access worker stopped");
}
