#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::mpsc;
use yaturl::application::services::{LinkService, LinkStore, StatsService};
use yaturl::domain::access_event::AccessEvent;
use yaturl::domain::fingerprint::{FullHash, Sha1Fingerprinter, fingerprint};
use yaturl::infrastructure::connection::{ConnectionManager, PoolSettings};
use yaturl::infrastructure::persistence::PgConnector;
use yaturl::state::AppState;
use yaturl::utils::url_normalizer::UrlNormalizer;

pub const BASE_URL: &str = "https://yaturl.test";

pub fn connector(pool: &PgPool) -> PgConnector {
    PgConnector::new((*pool.connect_options()).clone(), Duration::from_secs(5))
}

pub fn create_test_store(pool: &PgPool) -> Arc<LinkStore<PgConnector>> {
    let settings = PoolSettings {
        retry_delay: Duration::from_millis(10),
        ..PoolSettings::default()
    };
    let manager = Arc::new(ConnectionManager::new(connector(pool), settings));
    Arc::new(LinkStore::new(manager, 4))
}

pub fn create_test_state(
    pool: &PgPool,
) -> (AppState<PgConnector>, mpsc::Receiver<AccessEvent>) {
    let store = create_test_store(pool);
    let (tx, rx) = mpsc::channel(100);

    let link_service = Arc::new(LinkService::new(
        Arc::clone(&store),
        Arc::new(Sha1Fingerprinter),
        UrlNormalizer::new(4096, Some("yaturl.test")),
    ));
    let stats_service = Arc::new(StatsService::new(store));

    (
        AppState::new(link_service, stats_service, tx, BASE_URL),
        rx,
    )
}

/// Inserts a link under a chosen short hash, bypassing prefix allocation.
///
/// The stored full hash starts with `short_hash` and is padded from the
/// URL's fingerprint.
pub async fn create_test_link(pool: &PgPool, short_hash: &str, url: &str) -> i64 {
    let padding = fingerprint(url).unwrap();
    let full_hash =
        FullHash::parse(&format!("{short_hash}{}", &padding.as_str()[short_hash.len()..])).unwrap();
    insert_link(pool, short_hash, &full_hash, url).await
}

pub async fn insert_link(pool: &PgPool, short_hash: &str, full_hash: &FullHash, url: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO link (short_hash, full_hash, url) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(short_hash)
    .bind(full_hash.as_str())
    .bind(url)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn create_test_access(pool: &PgPool, link_id: i64, at: &str) {
    sqlx::query("INSERT INTO access_log (link_id, access_time) VALUES ($1, $2::timestamptz)")
        .bind(link_id)
        .bind(at)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn count_rows(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}
