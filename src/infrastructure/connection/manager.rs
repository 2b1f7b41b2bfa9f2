//! Pooled connections with ping-before-use and bounded retry.
//!
//! # Checkout
//!
//! Every checkout costs one attempt:
//!
//! 1. Pop an idle connection and ping it; a dead one is discarded
//! 2. Otherwise open a fresh connection and ping it
//!
//! Attempts failing with [`BackendError::ConnectionLost`] are retried after
//! `retry_delay` until `retry_count` attempts have been made. Any other fault
//! ends the checkout immediately.
//!
//! # Capacity
//!
//! At most `pool_size + max_overflow` connections are checked out at once.
//! Only `pool_size` connections are kept idle; overflow connections are closed
//! when released. Waiting for a free slot is bounded by `acquire_timeout`.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, error, info, warn};

use super::{BoxFuture, Connector};
use crate::domain::repositories::LinkBackend;
use crate::error::{BackendError, ConnectionError, LinkError};

/// Sizing and retry policy of a [`ConnectionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Connections retained while idle.
    pub pool_size: usize,
    /// Extra connections allowed under load, closed on release.
    pub max_overflow: usize,
    /// Checkout attempts before giving up. Values below 1 count as 1.
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pool_size: 5,
            max_overflow: 10,
            retry_count: 3,
            retry_delay: Duration::from_millis(50),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    pub idle: usize,
    pub in_use: usize,
    pub capacity: usize,
}

/// Hands out live connections and hides transient database outages.
///
/// Safe to share between tasks; wrap it in an [`Arc`].
pub struct ConnectionManager<C: Connector> {
    connector: C,
    settings: PoolSettings,
    idle: Arc<Mutex<Vec<C::Connection>>>,
    slots: Arc<Semaphore>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, settings: PoolSettings) -> Self {
        let capacity = settings.pool_size.max(1) + settings.max_overflow;
        Self {
            connector,
            settings,
            idle: Arc::new(Mutex::new(Vec::new())),
            slots: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn status(&self) -> PoolStatus {
        let capacity = self.settings.pool_size.max(1) + self.settings.max_overflow;
        PoolStatus {
            idle: self.idle.lock().len(),
            in_use: capacity - self.slots.available_permits(),
            capacity,
        }
    }

    /// Checks out a connection that answered a ping.
    ///
    /// The connection goes back to the pool when the returned guard is
    /// released or dropped, so early returns and panics cannot leak it.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] once the retry budget is spent, on the
    /// first non-transient fault, or when no slot frees up in time.
    pub async fn acquire(&self) -> Result<PooledConnection<C::Connection>, ConnectionError> {
        self.acquire_counted(&AtomicU32::new(0)).await
    }

    /// Checks out a connection, charging every attempt to `attempts`.
    ///
    /// Only the part of the retry budget not yet recorded in `attempts` is
    /// available to this checkout.
    async fn acquire_counted(
        &self,
        attempts: &AtomicU32,
    ) -> Result<PooledConnection<C::Connection>, ConnectionError> {
        let permit = self.reserve_slot().await?;

        let budget = self.settings.retry_count.max(1);
        let retries = budget
            .saturating_sub(attempts.load(Ordering::Relaxed))
            .saturating_sub(1);
        let strategy = FixedInterval::new(self.settings.retry_delay).take(retries as usize);

        let conn = RetryIf::start(
            strategy,
            || self.checkout(attempts),
            |fault: &BackendError| fault.is_connectivity(),
        )
        .await
        .map_err(|last_fault| {
            let attempts = attempts.load(Ordering::Relaxed);
            error!(attempts, fault = %last_fault, "Giving up on database connection");
            ConnectionError {
                attempts,
                last_fault,
            }
        })?;

        let attempts = attempts.load(Ordering::Relaxed);
        if attempts > 1 {
            info!(attempts, "Database connection re-established");
        }

        Ok(PooledConnection {
            conn: Some(conn),
            idle: Arc::clone(&self.idle),
            retain: self.settings.pool_size,
            broken: false,
            _permit: permit,
        })
    }

    /// Runs `op` on a pooled connection, re-running it on a fresh connection
    /// when the connection drops mid-operation.
    ///
    /// `op` may therefore execute more than once. Each run must be safe to
    /// replay, which holds for the store's idempotent writes. Failed
    /// connection attempts and lost runs share one budget of `retry_count`.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Connection`] when no working connection can be had
    /// - [`LinkError::Store`] when the operation fails for a non-transient reason
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let link = manager
    ///     .run(|conn| conn.link_by_full_hash(full_hash.clone()))
    ///     .await?;
    /// ```
    pub async fn run<T, F>(&self, mut op: F) -> Result<T, LinkError>
    where
        F: for<'c> FnMut(&'c mut C::Connection) -> BoxFuture<'c, Result<T, BackendError>> + Send,
        T: Send,
    {
        let budget = self.settings.retry_count.max(1);
        let attempts = AtomicU32::new(0);

        loop {
            let mut conn = self.acquire_counted(&attempts).await?;

            match op(&mut *conn).await {
                Ok(value) => {
                    conn.release();
                    return Ok(value);
                }
                Err(fault) if fault.is_connectivity() => {
                    conn.invalidate();
                    drop(conn);
                    let attempt = attempts.load(Ordering::Relaxed);
                    if attempt >= budget {
                        error!(attempts = attempt, %fault, "Operation abandoned after connection loss");
                        return Err(ConnectionError {
                            attempts: attempt,
                            last_fault: fault,
                        }
                        .into());
                    }
                    warn!(attempt, %fault, "Connection lost mid-operation, retrying");
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(fault) => {
                    conn.release();
                    return Err(LinkError::Store(fault.to_string()));
                }
            }
        }
    }

    async fn reserve_slot(&self) -> Result<OwnedSemaphorePermit, ConnectionError> {
        let wait = self.settings.acquire_timeout;
        match tokio::time::timeout(wait, Arc::clone(&self.slots).acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(ConnectionError {
                attempts: 0,
                last_fault: BackendError::PoolClosed,
            }),
            Err(_) => {
                warn!(?wait, "Timed out waiting for a free connection slot");
                Err(ConnectionError {
                    attempts: 0,
                    last_fault: BackendError::PoolTimedOut(wait),
                })
            }
        }
    }

    async fn checkout(&self, attempts: &AtomicU32) -> Result<C::Connection, BackendError> {
        let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;

        let pooled = self.idle.lock().pop();
        if let Some(mut conn) = pooled {
            match conn.ping().await {
                Ok(()) => return Ok(conn),
                Err(fault) => debug!(attempt, %fault, "Discarding stale pooled connection"),
            }
        }

        let mut conn = self.connector.connect().await.inspect_err(|fault| {
            warn!(attempt, %fault, "Database connection attempt failed");
        })?;
        conn.ping().await?;
        debug!(attempt, "Opened database connection");
        Ok(conn)
    }
}

/// A connection checked out of a [`ConnectionManager`].
///
/// Dereferences to the underlying connection.
pub struct PooledConnection<T> {
    conn: Option<T>,
    idle: Arc<Mutex<Vec<T>>>,
    retain: usize,
    broken: bool,
    _permit: OwnedSemaphorePermit,
}

impl<T> PooledConnection<T> {
    /// Returns the connection to the pool.
    pub fn release(mut self) {
        self.give_back();
    }

    /// Marks the connection as unusable; it is closed instead of pooled.
    pub fn invalidate(&mut self) {
        self.broken = true;
    }

    fn give_back(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.broken {
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() < self.retain {
            idle.push(conn);
        }
    }
}

impl<T> Deref for PooledConnection<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.conn
            .as_ref()
            .expect("connection is present until the guard is released")
    }
}

impl<T> DerefMut for PooledConnection<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.conn
            .as_mut()
            .expect("connection is present until the guard is released")
    }
}

impl<T> Drop for PooledConnection<T> {
    fn drop(&mut self) {
        self.give_back();
    }
}
