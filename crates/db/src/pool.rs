//! Lazily-constructed, self-healing connection pool.
//!
//! [`PoolManager`] owns at most one pool at a time. The pool is built on the
//! first [`acquire`](PoolManager::acquire), not at startup, so the process
//! can boot while the backing store is still suspended. A failed construction
//! or a broken checkout drops the cached pool and the next attempt builds a
//! fresh one. A checkout that only timed out waiting for a free slot keeps
//! the pool, so the connection ceiling holds while the pool is busy.
//!
//! Connections are returned to the pool when the value handed out by
//! `acquire` is dropped, so every exit path of a caller releases its slot.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{Connector, DbError, PgConnector, PoolConfig, RetryPolicy};

/// The pool manager used across the whole application.
pub type DbPool = PoolManager<PgConnector>;

struct Slot<P> {
    generation: u64,
    pool: P,
}

pub struct PoolManager<C: Connector = PgConnector> {
    connector: C,
    retry: RetryPolicy,
    slot: Mutex<Option<Slot<C::Pool>>>,
    constructed: AtomicU64,
}

impl DbPool {
    /// Build a manager for Postgres. No connection is opened here.
    pub fn from_config(config: &PoolConfig) -> Result<Self, DbError> {
        info!(
            min_connections = config.min_connections,
            max_connections = config.max_connections,
            require_tls = config.require_tls,
            "configuring database pool (lazy)"
        );
        Ok(Self::new(PgConnector::from_config(config)?, config.retry))
    }
}

impl<C: Connector> PoolManager<C> {
    pub fn new(connector: C, retry: RetryPolicy) -> Self {
        Self {
            connector,
            retry,
            slot: Mutex::new(None),
            constructed: AtomicU64::new(0),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Number of pools built so far (including ones since invalidated).
    pub fn constructions(&self) -> u64 {
        self.constructed.load(Ordering::Acquire)
    }

    /// Whether a pool is currently cached.
    pub async fn is_initialized(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Check out a connection, building the pool first if needed.
    ///
    /// Retries with the fixed delay of the [`RetryPolicy`]. After the last
    /// attempt fails, returns [`DbError::Unavailable`]. A pool that was only
    /// busy stays cached; a broken one is dropped and rebuilt on the next call.
    pub async fn acquire(&self) -> Result<C::Conn, DbError> {
        let attempts = self.retry.attempts();

        for attempt in 1..=attempts {
            match self.try_acquire().await {
                Ok(conn) => {
                    if attempt > 1 {
                        info!(attempt, "database connection acquired after retry");
                    }
                    return Ok(conn);
                }
                Err((generation, err)) => {
                    if let Some(generation) = generation {
                        self.invalidate(generation).await;
                    }
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        error = %err,
                        "failed to acquire database connection"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }

        error!(attempts, "backing store unavailable, giving up");
        Err(DbError::Unavailable { attempts })
    }

    /// On failure, also returns the generation to invalidate, if any.
    async fn try_acquire(&self) -> Result<C::Conn, (Option<u64>, DbError)> {
        let (generation, pool) = self.current().await.map_err(|e| (None, e))?;
        self.connector.checkout(&pool).await.map_err(|e| {
            if e.is_pool_timeout() {
                (None, e)
            } else {
                (Some(generation), e)
            }
        })
    }

    /// Return the cached pool, constructing it under the lock if absent so
    /// concurrent first callers share a single construction.
    async fn current(&self) -> Result<(u64, C::Pool), DbError> {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            return Ok((cached.generation, cached.pool.clone()));
        }

        let pool = self.connector.connect().await?;
        let generation = self.constructed.fetch_add(1, Ordering::AcqRel) + 1;
        info!(generation, "database pool constructed");

        *slot = Some(Slot { generation, pool: pool.clone() });
        Ok((generation, pool))
    }

    /// Drop and retire the cached pool, but only if it is still the one
    /// that failed.
    async fn invalidate(&self, generation: u64) {
        let stale = {
            let mut slot = self.slot.lock().await;
            if slot.as_ref().is_some_and(|s| s.generation == generation) {
                slot.take()
            } else {
                None
            }
        };
        if let Some(stale) = stale {
            warn!(generation, "database pool invalidated");
            self.connector.retire(stale.pool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    /// Connector whose first N connects / checkouts fail.
    #[derive(Default)]
    struct Scripted {
        failing_connects: AtomicU32,
        failing_checkouts: AtomicU32,
        busy_checkouts: AtomicU32,
        connects: AtomicU32,
        retired: AtomicU32,
        connect_latency: Duration,
    }

    impl Scripted {
        fn failing_connects(n: u32) -> Self {
            Self { failing_connects: AtomicU32::new(n), ..Self::default() }
        }

        fn failing_checkouts(n: u32) -> Self {
            Self { failing_checkouts: AtomicU32::new(n), ..Self::default() }
        }

        fn busy_checkouts(n: u32) -> Self {
            Self { busy_checkouts: AtomicU32::new(n), ..Self::default() }
        }
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    #[async_trait]
    impl Connector for Scripted {
        type Pool = u32;
        type Conn = u32;

        async fn connect(&self) -> Result<u32, DbError> {
            if !self.connect_latency.is_zero() {
                tokio::time::sleep(self.connect_latency).await;
            }
            let n = self.connects.fetch_add(1, Ordering::AcqRel) + 1;
            if take_failure(&self.failing_connects) {
                return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
            }
            Ok(n)
        }

        async fn checkout(&self, pool: &u32) -> Result<u32, DbError> {
            if take_failure(&self.busy_checkouts) {
                return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
            }
            if take_failure(&self.failing_checkouts) {
                return Err(DbError::Sqlx(sqlx::Error::PoolClosed));
            }
            Ok(*pool)
        }

        fn retire(&self, _pool: u32) {
            self.retired.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy { max_attempts, delay: Duration::from_secs(10) }
    }

    #[tokio::test(start_paused = true)]
    async fn pool_is_built_lazily_and_reused() {
        let manager = PoolManager::new(Scripted::default(), policy(3));
        assert_eq!(manager.constructions(), 0);
        assert!(!manager.is_initialized().await);

        manager.acquire().await.expect("first acquire");
        manager.acquire().await.expect("second acquire");

        assert_eq!(manager.constructions(), 1);
        assert!(manager.is_initialized().await);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_below_the_ceiling_are_absorbed() {
        let manager = PoolManager::new(Scripted::failing_connects(11), policy(12));

        let conn = manager.acquire().await.expect("should recover on the 12th attempt");

        assert_eq!(conn, 12);
        assert_eq!(manager.connector.connects.load(Ordering::Acquire), 12);
        assert_eq!(manager.constructions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_at_the_ceiling_report_unavailable() {
        let manager = PoolManager::new(Scripted::failing_connects(12), policy(12));

        let err = manager.acquire().await.unwrap_err();
        assert!(matches!(err, DbError::Unavailable { attempts: 12 }));
        assert!(!manager.is_initialized().await);

        // The next request starts from a clean slate.
        manager.acquire().await.expect("store is back");
        assert_eq!(manager.constructions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_wait_the_fixed_delay() {
        let manager = PoolManager::new(Scripted::failing_connects(3), policy(5));
        let started = tokio::time::Instant::now();

        manager.acquire().await.expect("recovers");

        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn checkout_failure_invalidates_and_rebuilds() {
        let manager = PoolManager::new(Scripted::failing_checkouts(1), policy(3));

        let conn = manager.acquire().await.expect("second pool serves the request");

        assert_eq!(conn, 2);
        assert_eq!(manager.constructions(), 2);
        assert_eq!(manager.connector.retired.load(Ordering::Acquire), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_pool_is_waited_on_not_replaced() {
        let manager = PoolManager::new(Scripted::busy_checkouts(2), policy(3));

        let conn = manager.acquire().await.expect("slot frees up on the third attempt");

        assert_eq!(conn, 1);
        assert_eq!(manager.constructions(), 1);
        assert_eq!(manager.connector.retired.load(Ordering::Acquire), 0);
        assert!(manager.is_initialized().await);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_pool_survives_exhausted_retries() {
        let manager = PoolManager::new(Scripted::busy_checkouts(3), policy(3));

        let err = manager.acquire().await.unwrap_err();

        assert!(matches!(err, DbError::Unavailable { attempts: 3 }));
        assert!(manager.is_initialized().await);
        assert_eq!(manager.constructions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_invalidation_keeps_the_newer_pool() {
        let manager = PoolManager::new(Scripted::default(), policy(1));
        let (generation, _) = manager.current().await.expect("build");

        manager.invalidate(generation + 1).await;
        assert!(manager.is_initialized().await);

        manager.invalidate(generation).await;
        assert!(!manager.is_initialized().await);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_first_acquisitions_build_one_pool() {
        let connector = Scripted {
            connect_latency: Duration::from_millis(50),
            ..Scripted::default()
        };
        let manager = Arc::new(PoolManager::new(connector, policy(1)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move { manager.acquire().await }));
        }
        for handle in handles {
            assert_eq!(handle.await.expect("task").expect("acquire"), 1);
        }

        assert_eq!(manager.constructions(), 1);
    }
}
