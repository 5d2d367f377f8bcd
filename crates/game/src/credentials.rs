//! Credential store: login checks and player registration.
//!
//! The hash never leaves the database. Lookups and comparisons happen in one
//! statement built from the configured [`CredentialHasher`].

use std::sync::Arc;

use serde::Serialize;
use sqlx::Connection;
use tracing::{error, info, instrument};

use db::repository::players;
use db::{CredentialHasher, DbPool};

use crate::{transaction, validate, GameError};

/// Who a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerIdentity {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredPlayer {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Clone)]
pub struct CredentialStore {
    pool: Arc<DbPool>,
    hasher: Arc<dyn CredentialHasher>,
}

impl CredentialStore {
    pub fn new(pool: Arc<DbPool>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { pool, hasher }
    }

    /// Check an email / password pair.
    ///
    /// # Errors
    /// [`GameError::InvalidCredentials`] for any mismatch, including an
    /// unknown email; [`GameError::BackingStoreUnavailable`] if the store
    /// cannot be reached.
    #[instrument(skip(self, secret))]
    pub async fn verify(&self, email: &str, secret: &str) -> Result<PlayerIdentity, GameError> {
        let email = validate::normalize_email(email);
        if email.is_empty() || secret.is_empty() {
            return Err(GameError::InvalidCredentials);
        }

        let mut conn = self.pool.acquire().await?;
        let found =
            players::find_by_credentials(&mut *conn, self.hasher.as_ref(), &email, secret).await?;

        match found {
            Some(row) => {
                info!(player_id = row.id, "login accepted");
                Ok(PlayerIdentity { id: row.id, username: row.username })
            }
            None => {
                info!("login rejected");
                Err(GameError::InvalidCredentials)
            }
        }
    }

    /// Create a player with a freshly salted hash of `secret`.
    ///
    /// # Errors
    /// - [`GameError::InvalidInput`] on malformed fields.
    /// - [`GameError::DuplicateIdentifier`] if the username or email is taken.
    /// - [`GameError::RegistrationFailed`] for any other storage failure; the
    ///   partial write is rolled back.
    #[instrument(skip(self, secret))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        secret: &str,
    ) -> Result<RegisteredPlayer, GameError> {
        let username = validate::username(username)?;
        let email = validate::email(email)?;
        validate::secret(secret)?;

        let outcome: Result<_, GameError> = async {
            let mut conn = self.pool.acquire().await?;
            let mut tx = conn.begin().await?;
            let result = players::insert_player(
                &mut *tx,
                self.hasher.as_ref(),
                &username,
                &email,
                secret,
            )
            .await
            .map_err(GameError::from);
            transaction::finish(tx, result).await
        }
        .await;

        match outcome {
            Ok(row) => {
                info!(player_id = row.id, "player registered");
                Ok(RegisteredPlayer { id: row.id, username: row.username, email: row.email })
            }
            Err(GameError::Store(err)) if err.is_unique_violation() => {
                info!(constraint = ?err.constraint(), "registration rejected: duplicate identifier");
                Err(GameError::DuplicateIdentifier)
            }
            Err(GameError::Store(err)) => {
                error!(error = %err, "registration failed");
                Err(GameError::RegistrationFailed)
            }
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::unreachable_pool;
    use db::PgCrypto;

    fn store() -> CredentialStore {
        CredentialStore::new(unreachable_pool(), Arc::new(PgCrypto::default()))
    }

    #[tokio::test]
    async fn blank_credentials_fail_uniformly_without_touching_the_store() {
        let store = store();
        assert!(matches!(
            store.verify("", "secret").await,
            Err(GameError::InvalidCredentials)
        ));
        assert!(matches!(
            store.verify("alice@example.com", "").await,
            Err(GameError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn registration_validates_before_connecting() {
        let store = store();
        assert!(matches!(
            store.register("al", "alice@example.com", "hunter22").await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            store.register("alice", "not-an-email", "hunter22").await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            store.register("alice", "alice@example.com", "short").await,
            Err(GameError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_store_is_reported_as_unavailable() {
        let store = store();
        assert!(matches!(
            store.verify("alice@example.com", "hunter22").await,
            Err(GameError::BackingStoreUnavailable)
        ));
        assert!(matches!(
            store.register("alice", "alice@example.com", "hunter22").await,
            Err(GameError::BackingStoreUnavailable)
        ));
    }
}
