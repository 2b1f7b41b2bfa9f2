//! PostgreSQL implementation of the link backend.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, FromRow};
use tracing::debug;

use crate::domain::entities::{BlockEntry, Link};
use crate::domain::fingerprint::{FullHash, ShortHash};
use crate::domain::repositories::{InsertOutcome, LinkBackend};
use crate::domain::statistics::{StatsBucket, Statistics, StatsRange, StatsSubject, Timespan};
use crate::error::BackendError;
use crate::infrastructure::connection::Connector;
use crate::utils::db_error::{map_sqlx_error, violated_unique_constraint};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const LINK_SHORT_HASH_KEY: &str = "link_short_hash_key";
const LINK_FULL_HASH_KEY: &str = "link_full_hash_key";

const SELECT_LINK: &str = "SELECT id, short_hash, full_hash, url, comment, created_at FROM link";

/// Opens PostgreSQL connections for the connection manager.
///
/// Every new session is switched to UTC so that date arithmetic in
/// statistics queries does not depend on the server's default time zone.
#[derive(Debug, Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgConnector {
    pub fn new(options: PgConnectOptions, connect_timeout: Duration) -> Self {
        Self {
            options,
            connect_timeout,
        }
    }

    /// # Errors
    ///
    /// Returns [`BackendError::Query`] if `url` is not a valid PostgreSQL URL.
    pub fn from_url(url: &str, connect_timeout: Duration) -> Result<Self, BackendError> {
        let options = PgConnectOptions::from_str(url)
            .map_err(|e| BackendError::Query(format!("invalid database url: {e}")))?;
        Ok(Self::new(options, connect_timeout))
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Connection = PgLinkConnection;

    async fn connect(&self) -> Result<PgLinkConnection, BackendError> {
        let mut conn = tokio::time::timeout(
            self.connect_timeout,
            PgConnection::connect_with(&self.options),
        )
        .await
        .map_err(|_| {
            BackendError::ConnectionLost(format!(
                "connect timed out after {:?}",
                self.connect_timeout
            ))
        })?
        .map_err(map_sqlx_error)?;

        sqlx::query("SET TIME ZONE 'UTC'")
            .execute(&mut conn)
            .await
            .map_err(map_sqlx_error)?;

        debug!("PostgreSQL session initialized");
        Ok(PgLinkConnection { conn })
    }
}

/// A live PostgreSQL session.
pub struct PgLinkConnection {
    conn: PgConnection,
}

impl PgLinkConnection {
    /// Applies pending schema migrations.
    pub async fn migrate(&mut self) -> Result<(), BackendError> {
        MIGRATOR
            .run(&mut self.conn)
            .await
            .map_err(|e| match e {
                sqlx::migrate::MigrateError::Execute(err) => map_sqlx_error(err),
                other => BackendError::Query(other.to_string()),
            })
    }
}

#[derive(FromRow)]
struct LinkRow {
    id: i64,
    short_hash: String,
    full_hash: String,
    url: String,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LinkRow> for Link {
    type Error = BackendError;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        let short_hash = ShortHash::parse(&row.short_hash).ok_or_else(|| {
            BackendError::Query(format!("malformed short hash in row {}", row.id))
        })?;
        let full_hash = FullHash::parse(&row.full_hash).ok_or_else(|| {
            BackendError::Query(format!("malformed full hash in row {}", row.id))
        })?;
        if !short_hash.is_prefix_of(&full_hash) {
            return Err(BackendError::Query(format!(
                "short hash of row {} is not a prefix of its full hash",
                row.id
            )));
        }
        Ok(Link::new(
            row.id,
            short_hash,
            full_hash,
            row.url,
            row.comment,
            row.created_at,
        ))
    }
}

#[derive(FromRow)]
struct BlockRow {
    link_id: i64,
    short_hash: String,
    comment: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<BlockRow> for BlockEntry {
    type Error = BackendError;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        let short_hash = ShortHash::parse(&row.short_hash).ok_or_else(|| {
            BackendError::Query(format!("malformed short hash in link {}", row.link_id))
        })?;
        Ok(BlockEntry {
            link_id: row.link_id,
            short_hash,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

fn source(subject: StatsSubject) -> (&'static str, &'static str) {
    match subject {
        StatsSubject::Links => ("link", "created_at"),
        StatsSubject::Redirects => ("access_log", "access_time"),
    }
}

/// `date_trunc` unit of a counting range; `None` counts everything.
fn window(range: StatsRange) -> Option<&'static str> {
    match range {
        StatsRange::Today => Some("day"),
        StatsRange::ThisWeek => Some("week"),
        StatsRange::ThisMonth => Some("month"),
        StatsRange::ThisYear => Some("year"),
        _ => None,
    }
}

/// `EXTRACT` field of a single-key grouped range.
fn group_field(range: StatsRange) -> Option<&'static str> {
    match range {
        StatsRange::PerHour => Some("HOUR"),
        StatsRange::PerDayOfWeek => Some("ISODOW"),
        StatsRange::PerDayOfMonth => Some("DAY"),
        _ => None,
    }
}

impl PgLinkConnection {
    async fn fetch_link(
        &mut self,
        filter: &str,
        value: &str,
    ) -> Result<Option<Link>, BackendError> {
        let sql = format!("{SELECT_LINK} WHERE {filter} = $1");
        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(value)
            .fetch_optional(&mut self.conn)
            .await
            .map_err(map_sqlx_error)?;
        row.map(Link::try_from).transpose()
    }

    async fn full_hash_exists(&mut self, full_hash: &FullHash) -> Result<bool, BackendError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM link WHERE full_hash = $1)")
            .bind(full_hash.as_str())
            .fetch_one(&mut self.conn)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl LinkBackend for PgLinkConnection {
    async fn ping(&mut self) -> Result<(), BackendError> {
        self.conn.ping().await.map_err(map_sqlx_error)
    }

    async fn insert_link(
        &mut self,
        short_hash: ShortHash,
        full_hash: FullHash,
        url: String,
    ) -> Result<InsertOutcome, BackendError> {
        let result = sqlx::query("INSERT INTO link (short_hash, full_hash, url) VALUES ($1, $2, $3)")
            .bind(short_hash.as_str())
            .bind(full_hash.as_str())
            .bind(&url)
            .execute(&mut self.conn)
            .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) => match violated_unique_constraint(&err) {
                // The short hash index is checked first, so a row that clashes
                // on both keys is reported here.
                Some(LINK_SHORT_HASH_KEY) => {
                    if self.full_hash_exists(&full_hash).await? {
                        Ok(InsertOutcome::FullHashTaken)
                    } else {
                        Ok(InsertOutcome::ShortHashTaken)
                    }
                }
                Some(LINK_FULL_HASH_KEY) => Ok(InsertOutcome::FullHashTaken),
                _ => Err(map_sqlx_error(err)),
            },
        }
    }

    async fn link_by_full_hash(
        &mut self,
        full_hash: FullHash,
    ) -> Result<Option<Link>, BackendError> {
        self.fetch_link("full_hash", full_hash.as_str()).await
    }

    async fn link_by_short_hash(
        &mut self,
        short_hash: ShortHash,
    ) -> Result<Option<Link>, BackendError> {
        self.fetch_link("short_hash", short_hash.as_str()).await
    }

    async fn block_entry(
        &mut self,
        short_hash: ShortHash,
    ) -> Result<Option<BlockEntry>, BackendError> {
        let row = sqlx::query_as::<_, BlockRow>(
            r#"
        SELECT b.link_id, l.short_hash, b.comment, b.created_at
        FROM block b
        JOIN link l ON l.id = b.link_id
        WHERE l.short_hash = $1
        "#,
        )
        .bind(short_hash.as_str())
        .fetch_optional(&mut self.conn)
        .await
        .map_err(map_sqlx_error)?;

        row.map(BlockEntry::try_from).transpose()
    }

    async fn insert_block(
        &mut self,
        short_hash: ShortHash,
        comment: String,
    ) -> Result<bool, BackendError> {
        let mut tx = self.conn.begin().await.map_err(map_sqlx_error)?;

        let link_id: Option<i64> = sqlx::query_scalar("SELECT id FROM link WHERE short_hash = $1")
            .bind(short_hash.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let Some(link_id) = link_id else {
            return Ok(false);
        };

        let inserted = sqlx::query(
            "INSERT INTO block (link_id, comment) VALUES ($1, $2) ON CONFLICT (link_id) DO NOTHING",
        )
        .bind(link_id)
        .bind(&comment)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        if inserted > 0 {
            sqlx::query("UPDATE link SET comment = $2 WHERE id = $1")
                .bind(link_id)
                .bind(&comment)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(true)
    }

    async fn insert_access(&mut self, short_hash: ShortHash) -> Result<bool, BackendError> {
        let inserted =
            sqlx::query("INSERT INTO access_log (link_id) SELECT id FROM link WHERE short_hash = $1")
                .bind(short_hash.as_str())
                .execute(&mut self.conn)
                .await
                .map_err(map_sqlx_error)?
                .rows_affected();

        Ok(inserted > 0)
    }

    async fn redirect_count(
        &mut self,
        short_hash: ShortHash,
    ) -> Result<Option<i64>, BackendError> {
        sqlx::query_scalar::<_, i64>(
            r#"
        SELECT COUNT(a.id)
        FROM link l
        LEFT JOIN access_log a ON a.link_id = l.id
        WHERE l.short_hash = $1
        GROUP BY l.id
        "#,
        )
        .bind(short_hash.as_str())
        .fetch_optional(&mut self.conn)
        .await
        .map_err(map_sqlx_error)
    }

    async fn statistics(
        &mut self,
        subject: StatsSubject,
        range: StatsRange,
    ) -> Result<Statistics, BackendError> {
        let (table, column) = source(subject);

        if range == StatsRange::PerWeek {
            let sql = format!(
                "SELECT EXTRACT(ISOYEAR FROM {column})::int4, EXTRACT(WEEK FROM {column})::int4, COUNT(*) \
                 FROM {table} GROUP BY 1, 2 ORDER BY 1, 2"
            );
            let rows = sqlx::query_as::<_, (i32, i32, i64)>(&sql)
                .fetch_all(&mut self.conn)
                .await
                .map_err(map_sqlx_error)?;
            return Ok(Statistics::Grouped(
                rows.into_iter()
                    .map(|(year, bucket, count)| StatsBucket {
                        year: Some(year),
                        bucket,
                        count,
                    })
                    .collect(),
            ));
        }

        if let Some(field) = group_field(range) {
            let sql = format!(
                "SELECT EXTRACT({field} FROM {column})::int4, COUNT(*) \
                 FROM {table} GROUP BY 1 ORDER BY 1"
            );
            let rows = sqlx::query_as::<_, (i32, i64)>(&sql)
                .fetch_all(&mut self.conn)
                .await
                .map_err(map_sqlx_error)?;
            return Ok(Statistics::Grouped(
                rows.into_iter()
                    .map(|(bucket, count)| StatsBucket {
                        year: None,
                        bucket,
                        count,
                    })
                    .collect(),
            ));
        }

        let sql = match window(range) {
            Some(unit) => format!(
                "SELECT COUNT(*) FROM {table} \
                 WHERE date_trunc('{unit}', {column}) = date_trunc('{unit}', now())"
            ),
            None => format!("SELECT COUNT(*) FROM {table}"),
        };
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&mut self.conn)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Statistics::Count(count))
    }

    async fn timespan(&mut self, subject: StatsSubject) -> Result<Timespan, BackendError> {
        let (table, column) = source(subject);
        let sql = format!("SELECT MIN({column}), MAX({column}) FROM {table}");

        let (first, last) =
            sqlx::query_as::<_, (Option<DateTime<Utc>>, Option<DateTime<Utc>>)>(&sql)
                .fetch_one(&mut self.conn)
                .await
                .map_err(map_sqlx_error)?;

        Ok(Timespan { first, last })
    }

    async fn redirect_timespan(
        &mut self,
        short_hash: ShortHash,
    ) -> Result<Timespan, BackendError> {
        let (first, last) = sqlx::query_as::<_, (Option<DateTime<Utc>>, Option<DateTime<Utc>>)>(
            r#"
        SELECT MIN(a.access_time), MAX(a.access_time)
        FROM access_log a
        JOIN link l ON l.id = a.link_id
        WHERE l.short_hash = $1
        "#,
        )
        .bind(short_hash.as_str())
        .fetch_one(&mut self.conn)
        .await
        .map_err(map_sqlx_error)?;

        Ok(Timespan { first, last })
    }
}
