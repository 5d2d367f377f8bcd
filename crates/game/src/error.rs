//! Game-level error types.

use db::DbError;
use thiserror::Error;

/// Every way a core operation can fail.
///
/// Messages are safe to show to a player: none of them carries backing-store
/// text. The underlying [`DbError`] of [`GameError::Store`] is only reachable
/// through `source()` for logging.
#[derive(Debug, Error)]
pub enum GameError {
    /// The pool exhausted its retries. Fatal for this request only.
    #[error("the game database is unavailable, try again shortly")]
    BackingStoreUnavailable,

    /// Unknown email or wrong secret; the two are indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("username or email already registered")]
    DuplicateIdentifier,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The entity does not exist or is not reachable from the acting player.
    #[error("not found")]
    NotFoundOrForbidden,

    /// Pet creation without any owned character to attach it to.
    #[error("create a character before adopting a pet")]
    NoOwnedParent,

    /// The session refers to a player that no longer exists.
    #[error("unknown player, please log in again")]
    UnknownPlayer,

    #[error("registration failed")]
    RegistrationFailed,

    #[error("internal storage error")]
    Store(#[source] DbError),
}

impl From<DbError> for GameError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Unavailable { .. } => Self::BackingStoreUnavailable,
            other => Self::Store(other),
        }
    }
}

impl From<sqlx::Error> for GameError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn exhausted_retries_become_backing_store_unavailable() {
        let err = GameError::from(DbError::Unavailable { attempts: 12 });
        assert!(matches!(err, GameError::BackingStoreUnavailable));
    }

    #[test]
    fn store_errors_do_not_leak_their_text() {
        let err = GameError::from(sqlx::Error::Protocol("relation \"jugador\" does not exist".into()));
        assert!(matches!(err, GameError::Store(_)));
        assert_eq!(err.to_string(), "internal storage error");
        assert!(err.source().is_some());
    }
}
