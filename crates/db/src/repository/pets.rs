//! `mascota` operations. A pet is owned through its character, so every
//! query joins `personaje` to check the owning player.

use sqlx::PgConnection;

use crate::{models::PetRow, DbError};

pub async fn list_pets(conn: &mut PgConnection, player_id: i64) -> Result<Vec<PetRow>, DbError> {
    let rows = sqlx::query_as::<_, PetRow>(
        r#"
        SELECT m.id, m.id_personaje AS character_id, m.nombre AS name,
               m.tipo AS kind, m.nivel AS level
        FROM mascota m
        JOIN personaje c ON c.id = m.id_personaje
        WHERE c.id_jugador = $1
        ORDER BY m.id
        "#,
    )
    .bind(player_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

pub async fn get_pet(
    conn: &mut PgConnection,
    player_id: i64,
    pet_id: i64,
) -> Result<Option<PetRow>, DbError> {
    let row = sqlx::query_as::<_, PetRow>(
        r#"
        SELECT m.id, m.id_personaje AS character_id, m.nombre AS name,
               m.tipo AS kind, m.nivel AS level
        FROM mascota m
        JOIN personaje c ON c.id = m.id_personaje
        WHERE m.id = $1 AND c.id_jugador = $2
        "#,
    )
    .bind(pet_id)
    .bind(player_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Insert a pet under `character_id`. The caller has already checked that
/// the character belongs to the acting player.
pub async fn insert_pet(
    conn: &mut PgConnection,
    character_id: i64,
    name: &str,
    kind: &str,
) -> Result<PetRow, DbError> {
    let row = sqlx::query_as::<_, PetRow>(
        r#"
        INSERT INTO mascota (id_personaje, nombre, tipo)
        VALUES ($1, $2, $3)
        RETURNING id, id_personaje AS character_id, nombre AS name, tipo AS kind, nivel AS level
        "#,
    )
    .bind(character_id)
    .bind(name)
    .bind(kind)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row)
}

pub async fn update_pet(
    conn: &mut PgConnection,
    player_id: i64,
    pet_id: i64,
    name: &str,
    kind: &str,
) -> Result<Option<PetRow>, DbError> {
    let row = sqlx::query_as::<_, PetRow>(
        r#"
        UPDATE mascota m SET nombre = $3, tipo = $4
        FROM personaje c
        WHERE m.id = $1 AND c.id = m.id_personaje AND c.id_jugador = $2
        RETURNING m.id, m.id_personaje AS character_id, m.nombre AS name,
                  m.tipo AS kind, m.nivel AS level
        "#,
    )
    .bind(pet_id)
    .bind(player_id)
    .bind(name)
    .bind(kind)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

/// Returns the number of rows removed (0 or 1).
pub async fn delete_pet(conn: &mut PgConnection, player_id: i64, pet_id: i64) -> Result<u64, DbError> {
    let result = sqlx::query(
        r#"
        DELETE FROM mascota m
        USING personaje c
        WHERE m.id = $1 AND c.id = m.id_personaje AND c.id_jugador = $2
        "#,
    )
    .bind(pet_id)
    .bind(player_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
