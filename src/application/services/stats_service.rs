//! Usage statistics assembled from link store queries.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::services::LinkStore;
use crate::domain::entities::{BlockEntry, Link};
use crate::domain::fingerprint::ShortHash;
use crate::domain::statistics::{Statistics, StatsRange, StatsSubject};
use crate::error::LinkError;
use crate::infrastructure::connection::Connector;

/// Counts of one subject over the standard windows.
///
/// A window whose query failed is `None` rather than failing the whole summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodCounts {
    pub today: Option<i64>,
    pub this_week: Option<i64>,
    pub this_month: Option<i64>,
    pub this_year: Option<i64>,
    pub all: Option<i64>,
}

/// Service-wide overview of links and redirects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSummary {
    pub links: PeriodCounts,
    pub redirects: PeriodCounts,
    pub first_link: Option<DateTime<Utc>>,
    pub last_link: Option<DateTime<Utc>>,
    pub first_redirect: Option<DateTime<Utc>>,
    pub last_redirect: Option<DateTime<Utc>>,
}

/// Statistics of a single link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatistics {
    pub link: Link,
    pub redirects: i64,
    pub first_redirect: Option<DateTime<Utc>>,
    pub last_redirect: Option<DateTime<Utc>>,
    pub block: Option<BlockEntry>,
}

pub struct StatsService<C: Connector> {
    store: Arc<LinkStore<C>>,
}

impl<C: Connector> StatsService<C> {
    pub fn new(store: Arc<LinkStore<C>>) -> Self {
        Self { store }
    }

    /// Builds the overview. Never fails; unavailable figures are left empty.
    pub async fn summary(&self) -> StatsSummary {
        let links = self.period_counts(StatsSubject::Links).await;
        let redirects = self.period_counts(StatsSubject::Redirects).await;
        let link_span = self
            .store
            .timespan(StatsSubject::Links)
            .await
            .unwrap_or_default();
        let redirect_span = self
            .store
            .timespan(StatsSubject::Redirects)
            .await
            .unwrap_or_default();

        StatsSummary {
            links,
            redirects,
            first_link: link_span.first,
            last_link: link_span.last,
            first_redirect: redirect_span.first,
            last_redirect: redirect_span.last,
        }
    }

    async fn period_counts(&self, subject: StatsSubject) -> PeriodCounts {
        PeriodCounts {
            today: self.count(subject, StatsRange::Today).await,
            this_week: self.count(subject, StatsRange::ThisWeek).await,
            this_month: self.count(subject, StatsRange::ThisMonth).await,
            this_year: self.count(subject, StatsRange::ThisYear).await,
            all: self.count(subject, StatsRange::All).await,
        }
    }

    async fn count(&self, subject: StatsSubject, range: StatsRange) -> Option<i64> {
        self.store
            .get_statistics(subject, range.as_str())
            .await
            .and_then(|stats| stats.count())
    }

    /// Runs a named statistics query; see [`LinkStore::get_statistics`].
    pub async fn query(&self, subject: StatsSubject, range: &str) -> Option<Statistics> {
        self.store.get_statistics(subject, range).await
    }

    /// Statistics of one link, or `None` if the link does not exist.
    ///
    /// # Errors
    ///
    /// Propagates link store failures.
    pub async fn link_statistics(
        &self,
        short_hash: &ShortHash,
    ) -> Result<Option<LinkStatistics>, LinkError> {
        let Some(link) = self.store.link_details(short_hash).await? else {
            return Ok(None);
        };
        let redirects = self.store.redirect_count(short_hash).await?.unwrap_or(0);
        let span = self
            .store
            .redirect_timespan(short_hash)
            .await
            .unwrap_or_default();
        let block = self.store.is_blocked(short_hash).await?;

        Ok(Some(LinkStatistics {
            link,
            redirects,
            first_redirect: span.first,
            last_redirect: span.last,
            block,
        }))
    }
}
