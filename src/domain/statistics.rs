//! Statistics vocabulary: what can be counted and how results are shaped.

use std::str::FromStr;

use chrono::{DateTime, Utc};

/// What a statistics query counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsSubject {
    /// Link creations.
    Links,
    /// Successful redirects.
    Redirects,
}

impl StatsSubject {
    pub fn as_str(self) -> &'static str {
        match self {
            StatsSubject::Links => "links",
            StatsSubject::Redirects => "redirects",
        }
    }
}

impl FromStr for StatsSubject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "links" => Ok(StatsSubject::Links),
            "redirects" => Ok(StatsSubject::Redirects),
            _ => Err(format!("unknown statistics subject '{s}'")),
        }
    }
}

/// Time window or grouping of a statistics query.
///
/// Counting ranges yield a single number; grouped ranges yield one bucket
/// per calendar unit. All boundaries are evaluated in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsRange {
    Today,
    ThisWeek,
    ThisMonth,
    ThisYear,
    All,
    PerWeek,
    PerHour,
    PerDayOfWeek,
    PerDayOfMonth,
}

impl StatsRange {
    pub const ALL: [StatsRange; 9] = [
        StatsRange::Today,
        StatsRange::ThisWeek,
        StatsRange::ThisMonth,
        StatsRange::ThisYear,
        StatsRange::All,
        StatsRange::PerWeek,
        StatsRange::PerHour,
        StatsRange::PerDayOfWeek,
        StatsRange::PerDayOfMonth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatsRange::Today => "today",
            StatsRange::ThisWeek => "this_week",
            StatsRange::ThisMonth => "this_month",
            StatsRange::ThisYear => "this_year",
            StatsRange::All => "all",
            StatsRange::PerWeek => "per_week",
            StatsRange::PerHour => "per_hour",
            StatsRange::PerDayOfWeek => "per_dow",
            StatsRange::PerDayOfMonth => "per_dom",
        }
    }

    pub fn is_grouped(self) -> bool {
        matches!(
            self,
            StatsRange::PerWeek
                | StatsRange::PerHour
                | StatsRange::PerDayOfWeek
                | StatsRange::PerDayOfMonth
        )
    }
}

impl FromStr for StatsRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatsRange::ALL
            .into_iter()
            .find(|range| range.as_str() == s)
            .ok_or_else(|| format!("unknown statistics range '{s}'"))
    }
}

/// One group of a grouped statistics query.
///
/// `year` is only set for [`StatsRange::PerWeek`], where `bucket` is the ISO
/// week number. Otherwise `bucket` is the hour (0-23), ISO weekday (1 = Monday)
/// or day of month (1-31).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsBucket {
    pub year: Option<i32>,
    pub bucket: i32,
    pub count: i64,
}

/// Result of a statistics query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statistics {
    Count(i64),
    Grouped(Vec<StatsBucket>),
}

impl Statistics {
    pub fn count(&self) -> Option<i64> {
        match self {
            Statistics::Count(n) => Some(*n),
            Statistics::Grouped(_) => None,
        }
    }
}

/// Earliest and latest timestamps of a subject. Both are `None` when there
/// is nothing to count yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timespan {
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}
