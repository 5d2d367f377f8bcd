//! `jugador` operations: credentials, session snapshot, active references.

use serde::Deserialize;
use sqlx::PgConnection;

use crate::{
    hash::CredentialHasher,
    models::{PlayerIdentityRow, PlayerRankingRow, PlayerRow, SessionRow, SessionSnapshot},
    DbError,
};

const RETURNING_PLAYER: &str = "RETURNING id, nombre_usuario AS username, \
     correo_electronico AS email, experiencia AS experience, nivel AS level, \
     id_personaje_activo AS active_character_id, id_mascota_activa AS active_pet_id";

// ---------------------------------------------------------------------------
// credentials
// ---------------------------------------------------------------------------

/// Insert a new player, hashing `secret` inside the store with a fresh salt.
pub async fn insert_player(
    conn: &mut PgConnection,
    hasher: &dyn CredentialHasher,
    username: &str,
    email: &str,
    secret: &str,
) -> Result<PlayerRow, DbError> {
    let sql = format!(
        "INSERT INTO jugador (nombre_usuario, correo_electronico, contrasena_hash) \
         VALUES ($1, $2, {}) {RETURNING_PLAYER}",
        hasher.hash_expr(3),
    );

    let row = sqlx::query_as::<_, PlayerRow>(&sql)
        .bind(username)
        .bind(email)
        .bind(secret)
        .fetch_one(&mut *conn)
        .await?;

    Ok(row)
}

/// Look a player up by email and check `secret` in the same statement.
///
/// Returns `None` both for an unknown email and for a wrong secret.
pub async fn find_by_credentials(
    conn: &mut PgConnection,
    hasher: &dyn CredentialHasher,
    email: &str,
    secret: &str,
) -> Result<Option<PlayerIdentityRow>, DbError> {
    let sql = format!(
        "SELECT id, nombre_usuario AS username FROM jugador \
         WHERE correo_electronico = $1 AND {}",
        hasher.verify_expr("contrasena_hash", 2),
    );

    let row = sqlx::query_as::<_, PlayerIdentityRow>(&sql)
        .bind(email)
        .bind(secret)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// reads
// ---------------------------------------------------------------------------

/// The player plus whichever active character / pet still resolve through
/// the ownership chain. Dangling references come back as `None`.
pub async fn session_snapshot(
    conn: &mut PgConnection,
    player_id: i64,
) -> Result<Option<SessionSnapshot>, DbError> {
    let row = sqlx::query_as::<_, SessionRow>(
        r#"
        SELECT j.id, j.nombre_usuario AS username, j.correo_electronico AS email,
               j.experiencia AS experience, j.nivel AS level,
               j.id_personaje_activo AS active_character_id,
               j.id_mascota_activa AS active_pet_id,
               c.id AS character_id, c.nombre AS character_name,
               c.clase AS character_class, c.nivel AS character_level,
               m.id AS pet_id, m.id_personaje AS pet_character_id,
               m.nombre AS pet_name, m.tipo AS pet_kind, m.nivel AS pet_level
        FROM jugador j
        LEFT JOIN personaje c
               ON c.id = j.id_personaje_activo AND c.id_jugador = j.id
        LEFT JOIN mascota m
               ON m.id = j.id_mascota_activa
              AND EXISTS (
                    SELECT 1 FROM personaje owner
                    WHERE owner.id = m.id_personaje AND owner.id_jugador = j.id
              )
        WHERE j.id = $1
        "#,
    )
    .bind(player_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(SessionSnapshot::from))
}

/// Sort order of the public player list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerOrder {
    /// Highest level first, then most experience, then oldest account.
    #[default]
    Rank,
    /// Registration order.
    Id,
}

const LIST_BY_RANK: &str = "SELECT id, nombre_usuario AS username, nivel AS level, \
     experiencia AS experience FROM jugador \
     ORDER BY nivel DESC, experiencia DESC, id ASC LIMIT $1";

const LIST_BY_ID: &str = "SELECT id, nombre_usuario AS username, nivel AS level, \
     experiencia AS experience FROM jugador ORDER BY id ASC LIMIT $1";

/// Public player list.
pub async fn list_rankings(
    conn: &mut PgConnection,
    limit: i64,
    order: PlayerOrder,
) -> Result<Vec<PlayerRankingRow>, DbError> {
    let sql = match order {
        PlayerOrder::Rank => LIST_BY_RANK,
        PlayerOrder::Id => LIST_BY_ID,
    };
    let rows = sqlx::query_as::<_, PlayerRankingRow>(sql)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// writes
// ---------------------------------------------------------------------------

/// Take a row lock on the player. Returns `false` if the player is gone.
///
/// Every ownership-scoped mutation calls this first inside its transaction so
/// concurrent mutations for the same player serialize.
pub async fn lock_player(conn: &mut PgConnection, player_id: i64) -> Result<bool, DbError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM jugador WHERE id = $1 FOR UPDATE")
        .bind(player_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.is_some())
}

/// Row-lock the player and return their current experience.
pub async fn lock_experience(conn: &mut PgConnection, player_id: i64) -> Result<Option<i32>, DbError> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT experiencia FROM jugador WHERE id = $1 FOR UPDATE")
            .bind(player_id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(|(experience,)| experience))
}

/// Add experience and recompute the level (100 experience per level).
pub async fn grant_experience(
    conn: &mut PgConnection,
    player_id: i64,
    amount: i32,
) -> Result<Option<PlayerRow>, DbError> {
    let sql = format!(
        "UPDATE jugador \
         SET experiencia = experiencia + $2, nivel = (experiencia + $2) / 100 + 1 \
         WHERE id = $1 {RETURNING_PLAYER}"
    );

    let row = sqlx::query_as::<_, PlayerRow>(&sql)
        .bind(player_id)
        .bind(amount)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

/// Point the active character at `character_id` if the player owns it.
///
/// Returns `false` when nothing was updated.
pub async fn set_active_character(
    conn: &mut PgConnection,
    player_id: i64,
    character_id: i64,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"
        UPDATE jugador SET id_personaje_activo = $2
        WHERE id = $1
          AND EXISTS (SELECT 1 FROM personaje WHERE id = $2 AND id_jugador = $1)
        "#,
    )
    .bind(player_id)
    .bind(character_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Point the active pet at `pet_id` if it hangs off one of the player's characters.
pub async fn set_active_pet(
    conn: &mut PgConnection,
    player_id: i64,
    pet_id: i64,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"
        UPDATE jugador SET id_mascota_activa = $2
        WHERE id = $1
          AND EXISTS (
                SELECT 1 FROM mascota m
                JOIN personaje c ON c.id = m.id_personaje
                WHERE m.id = $2 AND c.id_jugador = $1
          )
        "#,
    )
    .bind(player_id)
    .bind(pet_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Clear the active character if it currently points at `character_id`.
pub async fn clear_active_character(
    conn: &mut PgConnection,
    player_id: i64,
    character_id: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE jugador SET id_personaje_activo = NULL \
         WHERE id = $1 AND id_personaje_activo = $2",
    )
    .bind(player_id)
    .bind(character_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Clear the active pet if it currently points at any of `pet_ids`.
pub async fn clear_active_pet(
    conn: &mut PgConnection,
    player_id: i64,
    pet_ids: &[i64],
) -> Result<(), DbError> {
    if pet_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "UPDATE jugador SET id_mascota_activa = NULL \
         WHERE id = $1 AND id_mascota_activa = ANY($2)",
    )
    .bind(player_id)
    .bind(pet_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
