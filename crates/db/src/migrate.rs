//! Embedded schema migrations (`migrations/` at the workspace root).

use sqlx::migrate::Migrator;
use tracing::info;

use crate::{DbError, DbPool};

/// The workspace migrations, embedded at build time.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply pending migrations through the pool manager, so a suspended store
/// gets the same retry treatment as any other request.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    info!("Running database migrations");
    let mut conn = pool.acquire().await?;
    MIGRATOR.run(&mut *conn).await?;
    Ok(())
}
