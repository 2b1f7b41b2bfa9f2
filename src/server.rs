//! HTTP server initialization and runtime setup.
//!
//! Handles the connection manager, migrations, worker spawning, and the Axum
//! server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use tokio::sync::mpsc;

use crate::application::services::{LinkService, LinkStore, StatsService};
use crate::config::Config;
use crate::domain::access_worker::run_access_worker;
use crate::domain::fingerprint::Sha1Fingerprinter;
use crate::infrastructure::connection::ConnectionManager;
use crate::infrastructure::persistence::PgConnector;
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::url_normalizer::UrlNormalizer;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Connection manager over PostgreSQL
/// - Apply migrations
/// - Background access worker
/// - Axum HTTP server, stopped on Ctrl-C
///
/// # Errors
///
/// Returns an error if:
/// - The database stays unreachable for every startup attempt
/// - Migrations fail
/// - Server bind fails
pub async fn run(config: Config) -> Result<()> {
    let connector = PgConnector::from_url(&config.database_url, config.connect_timeout())
        .context("Invalid DATABASE_URL")?;
    let connections = Arc::new(ConnectionManager::new(connector, config.pool_settings()));

    let mut conn = connections
        .acquire()
        .await
        .context("Failed to connect to database")?;
    conn.migrate().await.context("Failed to migrate")?;
    conn.release();
    tracing::info!("Connected to database, migrations applied");

    let store = Arc::new(LinkStore::new(connections, config.min_short_hash_length));
    let normalizer = UrlNormalizer::new(config.max_url_length, config.own_host().as_deref());
    let link_service = Arc::new(LinkService::new(
        Arc::clone(&store),
        Arc::new(Sha1Fingerprinter),
        normalizer,
    ));
    let stats_service = Arc::new(StatsService::new(Arc::clone(&store)));

    let (access_tx, access_rx) = mpsc::channel(config.access_queue_capacity);
    let worker = tokio::spawn(run_access_worker(access_rx, store));
    tracing::info!("Access worker started");

    let state = AppState::new(link_service, stats_service, access_tx, &config.base_url);
    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Dropping the router closed the queue; let the worker drain it.
    if let Err(e) = worker.await {
        tracing::error!("Access worker failed: {e}");
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
