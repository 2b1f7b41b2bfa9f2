//! Shortening and resolution of links.

use std::sync::Arc;

use tracing::{debug, error};

use crate::application::services::LinkStore;
use crate::domain::entities::BlockEntry;
use crate::domain::fingerprint::{Fingerprinter, ShortHash};
use crate::error::LinkError;
use crate::infrastructure::connection::Connector;
use crate::utils::url_normalizer::UrlNormalizer;

/// Log target for fingerprint collisions, for alert routing.
pub const COLLISION_LOG_TARGET: &str = "yaturl::collision";

/// Result of [`LinkService::shorten`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortened {
    pub short_hash: ShortHash,
    /// The normalized URL that was stored.
    pub url: String,
    /// `false` when the URL had been shortened before.
    pub created: bool,
}

/// Result of [`LinkService::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Redirect(String),
    Blocked(BlockEntry),
    NotFound,
}

/// Turns raw URLs into short links and short links back into URLs.
///
/// Pipeline for new links: normalize, fingerprint, look up, check for a
/// collision, allocate.
pub struct LinkService<C: Connector> {
    store: Arc<LinkStore<C>>,
    fingerprinter: Arc<dyn Fingerprinter>,
    normalizer: UrlNormalizer,
}

impl<C: Connector> LinkService<C> {
    pub fn new(
        store: Arc<LinkStore<C>>,
        fingerprinter: Arc<dyn Fingerprinter>,
        normalizer: UrlNormalizer,
    ) -> Self {
        Self {
            store,
            fingerprinter,
            normalizer,
        }
    }

    pub fn store(&self) -> &Arc<LinkStore<C>> {
        &self.store
    }

    /// Returns the short hash for `raw_url`, allocating one if needed.
    ///
    /// # Errors
    ///
    /// - [`LinkError::InvalidUrl`] / [`LinkError::Encoding`] for bad input
    /// - [`LinkError::Collision`] if another URL owns the fingerprint; also
    ///   logged at `error` level under [`COLLISION_LOG_TARGET`]
    /// - [`LinkError::Connection`] / [`LinkError::Store`] from the link store
    pub async fn shorten(&self, raw_url: &str) -> Result<Shortened, LinkError> {
        let url = self.normalizer.normalize(raw_url)?;
        let full_hash = self.fingerprinter.fingerprint(&url)?;

        let result = match self.store.find_by_full_hash(&full_hash).await? {
            Some(short_hash) => {
                if self.store.detect_collision(&full_hash, &url).await? {
                    Err(LinkError::Collision {
                        full_hash: full_hash.clone(),
                        url: url.clone(),
                    })
                } else {
                    debug!(%short_hash, "URL already shortened");
                    Ok(Shortened {
                        short_hash,
                        url,
                        created: false,
                    })
                }
            }
            None => self
                .store
                .allocate(&full_hash, &url)
                .await
                .map(|short_hash| Shortened {
                    short_hash,
                    url,
                    created: true,
                }),
        };

        if let Err(LinkError::Collision { full_hash, url }) = &result {
            error!(target: COLLISION_LOG_TARGET, %full_hash, %url, "Fingerprint collision");
        }
        result
    }

    /// Looks up where `short_hash` should redirect to.
    ///
    /// # Errors
    ///
    /// Propagates link store failures.
    pub async fn resolve(&self, short_hash: &ShortHash) -> Result<Resolution, LinkError> {
        let Some(url) = self.store.find_by_short_hash(short_hash).await? else {
            return Ok(Resolution::NotFound);
        };

        if let Some(entry) = self.store.is_blocked(short_hash).await? {
            debug!(%short_hash, "Refusing to resolve blocked link");
            return Ok(Resolution::Blocked(entry));
        }

        Ok(Resolution::Redirect(url))
    }
}
