//! Transaction completion shared by every mutating operation.

use sqlx::{Postgres, Transaction};
use tracing::warn;

use crate::GameError;

/// Commit on success, roll back on failure.
///
/// Either way the transaction is finished before the caller's pooled
/// connection goes back to the pool.
pub(crate) async fn finish<T>(
    tx: Transaction<'_, Postgres>,
    result: Result<T, GameError>,
) -> Result<T, GameError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}
