//! Typed error type for the db crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Every acquisition attempt allowed by the retry policy failed.
    #[error("backing store unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },

    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),
}

impl DbError {
    /// `true` when the store rejected a write because of a UNIQUE constraint.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Sqlx(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }

    /// `true` when an established pool had no free connection within its
    /// acquire timeout. The pool itself is still usable.
    pub fn is_pool_timeout(&self) -> bool {
        matches!(self, Self::Sqlx(sqlx::Error::PoolTimedOut))
    }

    /// Name of the violated constraint, when the store reported one.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::Sqlx(sqlx::Error::Database(db_err)) => db_err.constraint(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!DbError::InvalidConfig("x".into()).is_unique_violation());
        assert!(!DbError::Unavailable { attempts: 3 }.is_unique_violation());
        assert!(!DbError::Sqlx(sqlx::Error::RowNotFound).is_unique_violation());
        assert_eq!(DbError::Unavailable { attempts: 1 }.constraint(), None);
    }

    #[test]
    fn only_pool_timeouts_count_as_saturation() {
        assert!(DbError::Sqlx(sqlx::Error::PoolTimedOut).is_pool_timeout());
        assert!(!DbError::Sqlx(sqlx::Error::PoolClosed).is_pool_timeout());
        assert!(!DbError::Unavailable { attempts: 1 }.is_pool_timeout());
    }

    #[test]
    fn unavailable_reports_attempt_count() {
        let err = DbError::Unavailable { attempts: 12 };
        assert_eq!(err.to_string(), "backing store unavailable after 12 attempts");
    }
}
