//! Shared state injected into every handler.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::application::services::{LinkService, StatsService};
use crate::domain::access_event::AccessEvent;
use crate::infrastructure::connection::Connector;

/// Application state, generic over the storage connector so handlers can be
/// exercised against an in-memory backend.
pub struct AppState<C: Connector> {
    pub link_service: Arc<LinkService<C>>,
    pub stats_service: Arc<StatsService<C>>,
    pub access_sender: mpsc::Sender<AccessEvent>,
    /// Public base URL short links are rendered against, without trailing slash.
    pub base_url: Arc<str>,
}

impl<C: Connector> AppState<C> {
    pub fn new(
        link_service: Arc<LinkService<C>>,
        stats_service: Arc<StatsService<C>>,
        access_sender: mpsc::Sender<AccessEvent>,
        base_url: &str,
    ) -> Self {
        Self {
            link_service,
            stats_service,
            access_sender,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    pub fn short_url(&self, short_hash: &str) -> String {
        format!("{}/{}", self.base_url, short_hash)
    }
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            link_service: Arc::clone(&self.link_service),
            stats_service: Arc::clone(&self.stats_service),
            access_sender: self.access_sender.clone(),
            base_url: Arc::clone(&self.base_url),
        }
    }
}
