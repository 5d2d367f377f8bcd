//! Pool configuration.

use std::time::Duration;

use crate::DbError;

/// How hard [`PoolManager::acquire`](crate::PoolManager::acquire) tries
/// before giving up.
///
/// The defaults leave roughly two minutes for a suspended store to resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed delay between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Everything needed to build the Postgres pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub database_url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// How long a single acquisition waits for a free slot.
    pub acquire_timeout: Duration,
    /// Require TLS to the backing store (`sslmode=require`).
    pub require_tls: bool,
    pub retry: RetryPolicy,
}

impl PoolConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            require_tls: true,
            retry: RetryPolicy::default(),
        }
    }

    /// Reject bounds the pool cannot honour.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.database_url.trim().is_empty() {
            return Err(DbError::InvalidConfig("database url is empty".into()));
        }
        if self.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "max_connections must be at least 1".into(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(DbError::InvalidConfig(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_observed_policy() {
        let cfg = PoolConfig::new("postgres://localhost/videojuego");
        assert_eq!(cfg.min_connections, 1);
        assert_eq!(cfg.max_connections, 5);
        assert!(cfg.require_tls);
        assert_eq!(cfg.retry.max_attempts, 12);
        assert_eq!(cfg.retry.delay, Duration::from_secs(10));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let mut cfg = PoolConfig::new("postgres://localhost/videojuego");
        cfg.min_connections = 6;
        assert!(matches!(cfg.validate(), Err(DbError::InvalidConfig(_))));

        cfg.min_connections = 0;
        cfg.max_connections = 0;
        assert!(matches!(cfg.validate(), Err(DbError::InvalidConfig(_))));
    }

    #[test]
    fn empty_url_is_rejected() {
        let cfg = PoolConfig::new("   ");
        assert!(matches!(cfg.validate(), Err(DbError::InvalidConfig(_))));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy { max_attempts: 0, delay: Duration::ZERO };
        assert_eq!(policy.attempts(), 1);
    }
}
