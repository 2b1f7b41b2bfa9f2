//! DTOs for statistics endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::services::{LinkStatistics, PeriodCounts, StatsSummary};
use crate::domain::statistics::{Statistics, StatsBucket};

#[derive(Debug, Serialize)]
pub struct PeriodCountsDto {
    pub today: Option<i64>,
    pub this_week: Option<i64>,
    pub this_month: Option<i64>,
    pub this_year: Option<i64>,
    pub all: Option<i64>,
}

impl From<PeriodCounts> for PeriodCountsDto {
    fn from(counts: PeriodCounts) -> Self {
        Self {
            today: counts.today,
            this_week: counts.this_week,
            this_month: counts.this_month,
            this_year: counts.this_year,
            all: counts.all,
        }
    }
}

/// Service-wide statistics.
///
/// ```json
/// {
///   "links": { "today": 3, "this_week": 10, "this_month": 42, "this_year": 380, "all": 1024 },
///   "redirects": { "today": 17, "this_week": 90, "this_month": 400, "this_year": 5100, "all": 9000 },
///   "first_link": "2024-01-01T00:00:00Z",
///   "last_link": "2024-06-01T12:00:00Z",
///   "first_redirect": "2024-01-01T00:05:00Z",
///   "last_redirect": "2024-06-01T12:01:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct StatsSummaryResponse {
    pub links: PeriodCountsDto,
    pub redirects: PeriodCountsDto,
    pub first_link: Option<DateTime<Utc>>,
    pub last_link: Option<DateTime<Utc>>,
    pub first_redirect: Option<DateTime<Utc>>,
    pub last_redirect: Option<DateTime<Utc>>,
}

impl From<StatsSummary> for StatsSummaryResponse {
    fn from(summary: StatsSummary) -> Self {
        Self {
            links: summary.links.into(),
            redirects: summary.redirects.into(),
            first_link: summary.first_link,
            last_link: summary.last_link,
            first_redirect: summary.first_redirect,
            last_redirect: summary.last_redirect,
        }
    }
}

/// Statistics of a single link.
#[derive(Debug, Serialize)]
pub struct LinkStatsResponse {
    pub short_hash: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub redirects: i64,
    pub first_redirect: Option<DateTime<Utc>>,
    pub last_redirect: Option<DateTime<Utc>>,
    pub blocked: bool,
}

impl From<LinkStatistics> for LinkStatsResponse {
    fn from(stats: LinkStatistics) -> Self {
        Self {
            short_hash: stats.link.short_hash.to_string(),
            url: stats.link.url,
            created_at: stats.link.created_at,
            redirects: stats.redirects,
            first_redirect: stats.first_redirect,
            last_redirect: stats.last_redirect,
            blocked: stats.block.is_some(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BucketDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub bucket: i32,
    pub count: i64,
}

impl From<StatsBucket> for BucketDto {
    fn from(bucket: StatsBucket) -> Self {
        Self {
            year: bucket.year,
            bucket: bucket.bucket,
            count: bucket.count,
        }
    }
}

/// Result of a single named statistics query.
///
/// Counting ranges fill `count`; grouped ranges fill `buckets`.
#[derive(Debug, Serialize)]
pub struct StatsQueryResponse {
    pub subject: String,
    pub range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<BucketDto>>,
}

impl StatsQueryResponse {
    pub fn new(subject: &str, range: &str, stats: Statistics) -> Self {
        let (count, buckets) = match stats {
            Statistics::Count(n) => (Some(n), None),
            Statistics::Grouped(rows) => (None, Some(rows.into_iter().map(Into::into).collect())),
        };
        Self {
            subject: subject.to_string(),
            range: range.to_string(),
            count,
            buckets,
        }
    }
}
