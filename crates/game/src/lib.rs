//! `game` crate — the data-access and state-consistency core.
//!
//! Wraps the `db` crate's repository functions into operations scoped to an
//! authenticated player:
//! - [`CredentialStore`] — login checks and registration.
//! - [`SessionResolver`] — the player's aggregate view, experience, player list.
//! - [`Characters`] / [`Pets`] — [`OwnedRepository`] implementations.
//! - [`LivenessProbe`] — keeps the pool warm.
//!
//! Every operation returns a typed [`GameError`]; none of them leaks raw
//! backing-store text.

pub mod credentials;
pub mod entities;
pub mod error;
pub mod liveness;
pub mod session;
pub mod validate;

mod transaction;

use std::sync::Arc;

use db::{CredentialHasher, DbPool, PgCrypto};

pub use credentials::{CredentialStore, PlayerIdentity, RegisteredPlayer};
pub use entities::{CharacterAttrs, Characters, NewPet, OwnedRepository, PetChanges, Pets};
pub use error::GameError;
pub use liveness::{Liveness, LivenessProbe};
pub use db::repository::players::PlayerOrder;
pub use session::{PlayerRanking, PlayerSummary, SessionResolver, SessionView};

/// All core services, sharing one pool manager.
#[derive(Clone)]
pub struct Game {
    pub credentials: CredentialStore,
    pub sessions: SessionResolver,
    pub characters: Characters,
    pub pets: Pets,
    pub liveness: LivenessProbe,
}

impl Game {
    /// Services using the default pgcrypto hasher.
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self::with_hasher(pool, Arc::new(PgCrypto::default()))
    }

    pub fn with_hasher(pool: Arc<DbPool>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            credentials: CredentialStore::new(Arc::clone(&pool), hasher),
            sessions: SessionResolver::new(Arc::clone(&pool)),
            characters: Characters::new(Arc::clone(&pool)),
            pets: Pets::new(Arc::clone(&pool)),
            liveness: LivenessProbe::new(pool),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use db::{DbPool, PoolConfig, RetryPolicy};

    /// A pool pointed at a closed local port, failing after one short attempt.
    pub(crate) fn unreachable_pool() -> Arc<DbPool> {
        let mut config = PoolConfig::new("postgres://videojuego@127.0.0.1:1/videojuego");
        config.require_tls = false;
        config.acquire_timeout = Duration::from_millis(250);
        config.retry = RetryPolicy { max_attempts: 1, delay: Duration::ZERO };
        Arc::new(DbPool::from_config(&config).expect("valid config"))
    }
}
