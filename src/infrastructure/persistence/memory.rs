//! In-memory link database for unit tests.
//!
//! Mirrors the PostgreSQL backend's uniqueness rules and lets tests script
//! connectivity faults: refused connects, dropped statements and server
//! restarts that invalidate every open connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use parking_lot::Mutex;

use crate::domain::entities::{BlockEntry, Link};
use crate::domain::fingerprint::{FullHash, ShortHash};
use crate::domain::repositories::{InsertOutcome, LinkBackend};
use crate::domain::statistics::{StatsBucket, Statistics, StatsRange, StatsSubject, Timespan};
use crate::error::BackendError;
use crate::infrastructure::connection::Connector;

#[derive(Default)]
struct Tables {
    links: Vec<Link>,
    accesses: Vec<(i64, DateTime<Utc>)>,
    blocks: Vec<BlockEntry>,
    next_id: i64,
}

#[derive(Default)]
struct Faults {
    connects: AtomicU32,
    failing_connects: AtomicU32,
    refuse_connects: AtomicBool,
    reject_credentials: AtomicBool,
    dropped_operations: AtomicU32,
    lose_after_insert: AtomicBool,
    generation: AtomicU64,
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Shared handle to an in-memory database.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector { db: self.clone() }
    }

    /// The next `n` connects fail as if the server were unreachable.
    pub fn fail_next_connects(&self, n: u32) {
        self.faults.failing_connects.store(n, Ordering::SeqCst);
    }

    pub fn refuse_connects(&self, refuse: bool) {
        self.faults.refuse_connects.store(refuse, Ordering::SeqCst);
    }

    /// Connects fail with a non-transient error.
    pub fn reject_credentials(&self, reject: bool) {
        self.faults.reject_credentials.store(reject, Ordering::SeqCst);
    }

    /// The next `n` statements (pings excluded) lose their connection before running.
    pub fn drop_next_operations(&self, n: u32) {
        self.faults.dropped_operations.store(n, Ordering::SeqCst);
    }

    /// The next successful insert is applied, then its connection is lost
    /// before the outcome reaches the caller.
    pub fn lose_connection_after_next_insert(&self) {
        self.faults.lose_after_insert.store(true, Ordering::SeqCst);
    }

    /// Simulates a server restart: every open connection goes stale.
    pub fn restart(&self) {
        self.faults.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn connect_attempts(&self) -> u32 {
        self.faults.connects.load(Ordering::SeqCst)
    }

    pub fn seed_link(&self, short_hash: &str, full_hash: &FullHash, url: &str) -> i64 {
        self.seed_link_at(short_hash, full_hash, url, Utc::now())
    }

    pub fn seed_link_at(
        &self,
        short_hash: &str,
        full_hash: &FullHash,
        url: &str,
        created_at: DateTime<Utc>,
    ) -> i64 {
        let mut tables = self.tables.lock();
        tables.next_id += 1;
        let id = tables.next_id;
        tables.links.push(Link::new(
            id,
            ShortHash::parse(short_hash).expect("valid short hash"),
            full_hash.clone(),
            url.to_string(),
            None,
            created_at,
        ));
        id
    }

    pub fn seed_access_at(&self, link_id: i64, at: DateTime<Utc>) {
        self.tables.lock().accesses.push((link_id, at));
    }

    pub fn links(&self) -> Vec<Link> {
        self.tables.lock().links.clone()
    }

    pub fn access_count(&self) -> usize {
        self.tables.lock().accesses.len()
    }
}

pub struct MemoryConnector {
    db: MemoryDatabase,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection, BackendError> {
        let faults = &self.db.faults;
        faults.connects.fetch_add(1, Ordering::SeqCst);

        if faults.reject_credentials.load(Ordering::SeqCst) {
            return Err(BackendError::Query(
                "password authentication failed".to_string(),
            ));
        }
        if faults.refuse_connects.load(Ordering::SeqCst) || take_one(&faults.failing_connects) {
            return Err(BackendError::ConnectionLost(
                "connection refused".to_string(),
            ));
        }

        Ok(MemoryConnection {
            db: self.db.clone(),
            generation: faults.generation.load(Ordering::SeqCst),
        })
    }
}

pub struct MemoryConnection {
    db: MemoryDatabase,
    generation: u64,
}

impl MemoryConnection {
    fn check_alive(&self) -> Result<(), BackendError> {
        if self.generation == self.db.faults.generation.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::ConnectionLost(
                "server has gone away".to_string(),
            ))
        }
    }

    fn begin(&self) -> Result<(), BackendError> {
        self.check_alive()?;
        if take_one(&self.db.faults.dropped_operations) {
            return Err(BackendError::ConnectionLost(
                "lost connection during query".to_string(),
            ));
        }
        Ok(())
    }
}

fn column(tables: &Tables, subject: StatsSubject) -> Vec<DateTime<Utc>> {
    match subject {
        StatsSubject::Links => tables.links.iter().map(|l| l.created_at).collect(),
        StatsSubject::Redirects => tables.accesses.iter().map(|(_, at)| *at).collect(),
    }
}

fn group(times: &[DateTime<Utc>], key: impl Fn(&DateTime<Utc>) -> (Option<i32>, i32)) -> Vec<StatsBucket> {
    let mut buckets: Vec<StatsBucket> = Vec::new();
    for at in times {
        let (year, bucket) = key(at);
        match buckets
            .iter_mut()
            .find(|b| b.year == year && b.bucket == bucket)
        {
            Some(existing) => existing.count += 1,
            None => buckets.push(StatsBucket {
                year,
                bucket,
                count: 1,
            }),
        }
    }
    buckets.sort_by_key(|b| (b.year, b.bucket));
    buckets
}

fn span(times: &[DateTime<Utc>]) -> Timespan {
    Timespan {
        first: times.iter().min().copied(),
        last: times.iter().max().copied(),
    }
}

#[async_trait]
impl LinkBackend for MemoryConnection {
    async fn ping(&mut self) -> Result<(), BackendError> {
        self.check_alive()
    }

    async fn insert_link(
        &mut self,
        short_hash: ShortHash,
        full_hash: FullHash,
        url: String,
    ) -> Result<InsertOutcome, BackendError> {
        self.begin()?;
        let mut tables = self.db.tables.lock();
        let full_hash_taken = tables.links.iter().any(|l| l.full_hash == full_hash);
        if tables.links.iter().any(|l| l.short_hash == short_hash) {
            return Ok(if full_hash_taken {
                InsertOutcome::FullHashTaken
            } else {
                InsertOutcome::ShortHashTaken
            });
        }
        if full_hash_taken {
            return Ok(InsertOutcome::FullHashTaken);
        }
        tables.next_id += 1;
        let id = tables.next_id;
        tables
            .links
            .push(Link::new(id, short_hash, full_hash, url, None, Utc::now()));
        drop(tables);

        if self.db.faults.lose_after_insert.swap(false, Ordering::SeqCst) {
            return Err(BackendError::ConnectionLost(
                "lost connection before commit acknowledgement".to_string(),
            ));
        }
        Ok(InsertOutcome::Inserted)
    }

    async fn link_by_full_hash(
        &mut self,
        full_hash: FullHash,
    ) -> Result<Option<Link>, BackendError> {
        self.begin()?;
        let tables = self.db.tables.lock();
        Ok(tables
            .links
            .iter()
            .find(|l| l.full_hash == full_hash)
            .cloned())
    }

    async fn link_by_short_hash(
        &mut self,
        short_hash: ShortHash,
    ) -> Result<Option<Link>, BackendError> {
        self.begin()?;
        let tables = self.db.tables.lock();
        Ok(tables
            .links
            .iter()
            .find(|l| l.short_hash == short_hash)
            .cloned())
    }

    async fn block_entry(
        &mut self,
        short_hash: ShortHash,
    ) -> Result<Option<BlockEntry>, BackendError> {
        self.begin()?;
        let tables = self.db.tables.lock();
        Ok(tables
            .blocks
            .iter()
            .find(|b| b.short_hash == short_hash)
            .cloned())
    }

    async fn insert_block(
        &mut self,
        short_hash: ShortHash,
        comment: String,
    ) -> Result<bool, BackendError> {
        self.begin()?;
        let mut tables = self.db.tables.lock();
        let Some(link_id) = tables
            .links
            .iter()
            .find(|l| l.short_hash == short_hash)
            .map(|l| l.id)
        else {
            return Ok(false);
        };
        if tables.blocks.iter().any(|b| b.link_id == link_id) {
            return Ok(true);
        }
        if let Some(link) = tables.links.iter_mut().find(|l| l.id == link_id) {
            link.comment = Some(comment.clone());
        }
        tables.blocks.push(BlockEntry {
            link_id,
            short_hash,
            comment,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn insert_access(&mut self, short_hash: ShortHash) -> Result<bool, BackendError> {
        self.begin()?;
        let mut tables = self.db.tables.lock();
        let Some(link_id) = tables
            .links
            .iter()
            .find(|l| l.short_hash == short_hash)
            .map(|l| l.id)
        else {
            return Ok(false);
        };
        tables.accesses.push((link_id, Utc::now()));
        Ok(true)
    }

    async fn redirect_count(
        &mut self,
        short_hash: ShortHash,
    ) -> Result<Option<i64>, BackendError> {
        self.begin()?;
        let tables = self.db.tables.lock();
        let Some(link) = tables.links.iter().find(|l| l.short_hash == short_hash) else {
            return Ok(None);
        };
        let count = tables
            .accesses
            .iter()
            .filter(|(id, _)| *id == link.id)
            .count();
        Ok(Some(count as i64))
    }

    async fn statistics(
        &mut self,
        subject: StatsSubject,
        range: StatsRange,
    ) -> Result<Statistics, BackendError> {
        self.begin()?;
        let times = column(&self.db.tables.lock(), subject);
        let now = Utc::now();

        let count = |keep: &dyn Fn(&DateTime<Utc>) -> bool| {
            Statistics::Count(times.iter().filter(|at| keep(at)).count() as i64)
        };

        Ok(match range {
            StatsRange::Today => count(&|at| at.date_naive() == now.date_naive()),
            StatsRange::ThisWeek => count(&|at| at.iso_week() == now.iso_week()),
            StatsRange::ThisMonth => {
                count(&|at| at.year() == now.year() && at.month() == now.month())
            }
            StatsRange::ThisYear => count(&|at| at.year() == now.year()),
            StatsRange::All => Statistics::Count(times.len() as i64),
            StatsRange::PerWeek => Statistics::Grouped(group(&times, |at| {
                let week = at.iso_week();
                (Some(week.year()), week.week() as i32)
            })),
            StatsRange::PerHour => Statistics::Grouped(group(&times, |at| (None, at.hour() as i32))),
            StatsRange::PerDayOfWeek => Statistics::Grouped(group(&times, |at| {
                (None, at.weekday().number_from_monday() as i32)
            })),
            StatsRange::PerDayOfMonth => {
                Statistics::Grouped(group(&times, |at| (None, at.day() as i32)))
            }
        })
    }

    async fn timespan(&mut self, subject: StatsSubject) -> Result<Timespan, BackendError> {
        self.begin()?;
        Ok(span(&column(&self.db.tables.lock(), subject)))
    }

    async fn redirect_timespan(
        &mut self,
        short_hash: ShortHash,
    ) -> Result<Timespan, BackendError> {
        self.begin()?;
        let tables = self.db.tables.lock();
        let Some(link_id) = tables
            .links
            .iter()
            .find(|l| l.short_hash == short_hash)
            .map(|l| l.id)
        else {
            return Ok(Timespan::default());
        };
        let times: Vec<_> = tables
            .accesses
            .iter()
            .filter(|(id, _)| *id == link_id)
            .map(|(_, at)| *at)
            .collect();
        Ok(span(&times))
    }
}
