//! `personaje` operations, always scoped to the owning player.

use sqlx::PgConnection;

use crate::{models::CharacterRow, DbError};

/// All characters owned by `player_id`, ordered by id.
pub async fn list_characters(
    conn: &mut PgConnection,
    player_id: i64,
) -> Result<Vec<CharacterRow>, DbError> {
    let rows = sqlx::query_as::<_, CharacterRow>(
        r#"
        SELECT id, id_jugador AS player_id, nombre AS name, clase AS class, nivel AS level
        FROM personaje
        WHERE id_jugador = $1
        ORDER BY id
        "#,
    )
    .bind(player_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn get_character(
    conn: &mut PgConnection,
    player_id: i64,
    character_id: i64,
) -> Result<Option<CharacterRow>, DbError> {
    let row = sqlx::query_as::<_, CharacterRow>(
        r#"
        SELECT id, id_jugador AS player_id, nombre AS name, clase AS class, nivel AS level
        FROM personaje
        WHERE id = $1 AND id_jugador = $2
        "#,
    )
    .bind(character_id)
    .bind(player_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Share-lock `character_id` if the player owns it and return its id.
pub async fn lock_owned_character(
    conn: &mut PgConnection,
    player_id: i64,
    character_id: i64,
) -> Result<Option<i64>, DbError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM personaje WHERE id = $1 AND id_jugador = $2 FOR SHARE",
    )
    .bind(character_id)
    .bind(player_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|(id,)| id))
}

/// The character a new pet attaches to when none is named: the active
/// character if it is owned, otherwise the oldest owned character.
pub async fn lock_default_parent(
    conn: &mut PgConnection,
    player_id: i64,
) -> Result<Option<i64>, DbError> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT c.id
        FROM personaje c
        JOIN jugador j ON j.id = c.id_jugador
        WHERE c.id_jugador = $1
        ORDER BY CASE WHEN c.id = j.id_personaje_activo THEN 0 ELSE 1 END, c.id
        LIMIT 1
        FOR SHARE OF c
        "#,
    )
    .bind(player_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|(id,)| id))
}

/// Insert a character at the schema default level (1).
pub async fn insert_character(
    conn: &mut PgConnection,
    player_id: i64,
    name: &str,
    class: &str,
) -> Result<CharacterRow, DbError> {
    let row = sqlx::query_as::<_, CharacterRow>(
        r#"
        INSERT INTO personaje (id_jugador, nombre, clase)
        VALUES ($1, $2, $3)
        RETURNING id, id_jugador AS player_id, nombre AS name, clase AS class, nivel AS level
        "#,
    )
    .bind(player_id)
    .bind(name)
    .bind(class)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

/// Rename / reclass an owned character. `None` when not found or not owned.
pub async fn update_character(
    conn: &mut PgConnection,
    player_id: i64,
    character_id: i64,
    name: &str,
    class: &str,
) -> Result<Option<CharacterRow>, DbError> {
    let row = sqlx::query_as::<_, CharacterRow>(
        r#"
        UPDATE personaje SET nombre = $3, clase = $4
        WHERE id = $1 AND id_jugador = $2
        RETURNING id, id_jugador AS player_id, nombre AS name, clase AS class, nivel AS level
        "#,
    )
    .bind(character_id)
    .bind(player_id)
    .bind(name)
    .bind(class)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Delete the pets of an owned character and return their ids.
pub async fn delete_pets_of_character(
    conn: &mut PgConnection,
    player_id: i64,
    character_id: i64,
) -> Result<Vec<i64>, DbError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        DELETE FROM mascota m
        USING personaje c
        WHERE m.id_personaje = c.id AND c.id = $1 AND c.id_jugador = $2
        RETURNING m.id
        "#,
    )
    .bind(character_id)
    .bind(player_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Delete an owned character. Returns the number of rows removed (0 or 1).
pub async fn delete_character(
    conn: &mut PgConnection,
    player_id: i64,
    character_id: i64,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM personaje WHERE id = $1 AND id_jugador = $2")
        .bind(character_id)
        .bind(player_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}
