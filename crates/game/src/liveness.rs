//! Liveness probe that keeps the pool (and a suspend-on-idle store) warm.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use db::{DbError, DbPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Alive,
    Degraded,
}

#[derive(Clone)]
pub struct LivenessProbe {
    pool: Arc<DbPool>,
}

impl LivenessProbe {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Acquire a connection, run a no-op query, release it.
    ///
    /// Never fails: a store hiccup is reported as [`Liveness::Degraded`].
    pub async fn ping(&self) -> Liveness {
        match self.round_trip().await {
            Ok(()) => {
                debug!("liveness probe ok");
                Liveness::Alive
            }
            Err(err) => {
                warn!(error = %err, "liveness probe degraded");
                Liveness::Degraded
            }
        }
    }

    async fn round_trip(&self) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("SELECT 1").execute(&mut *conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::unreachable_pool;

    #[tokio::test]
    async fn unreachable_store_is_degraded_not_an_error() {
        let probe = LivenessProbe::new(unreachable_pool());
        assert_eq!(probe.ping().await, Liveness::Degraded);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_value(Liveness::Alive).unwrap(), "alive");
        assert_eq!(serde_json::to_value(Liveness::Degraded).unwrap(), "degraded");
    }
}
