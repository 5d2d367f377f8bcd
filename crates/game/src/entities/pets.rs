use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::{Connection, PgConnection};
use tracing::{info, instrument};

use db::models::PetRow;
use db::repository::{characters, pets, players};
use db::DbPool;

use crate::entities::{lock_player, OwnedRepository};
use crate::validate::{self, CATEGORY_MAX, NAME_MAX};
use crate::{transaction, GameError};

/// Attributes for a new pet.
///
/// Without `character_id` the pet joins the player's active character, or
/// their oldest character when no owned character is active.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPet {
    pub name: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
    #[serde(default)]
    pub character_id: Option<i64>,
}

impl NewPet {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { name: name.into(), kind: kind.into(), character_id: None }
    }

    pub fn under(mut self, character_id: i64) -> Self {
        self.character_id = Some(character_id);
        self
    }
}

/// Editable pet attributes. The owning character does not change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PetChanges {
    pub name: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,
}

impl PetChanges {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { name: name.into(), kind: kind.into() }
    }
}

fn validated(name: &str, kind: &str) -> Result<(String, String), GameError> {
    Ok((
        validate::label("name", name, NAME_MAX)?,
        validate::label("type", kind, CATEGORY_MAX)?,
    ))
}

#[derive(Clone)]
pub struct Pets {
    pool: Arc<DbPool>,
}

impl Pets {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Find (and share-lock) the character the new pet will belong to.
    async fn resolve_parent(
        conn: &mut PgConnection,
        player_id: i64,
        requested: Option<i64>,
    ) -> Result<i64, GameError> {
        match requested {
            Some(character_id) => characters::lock_owned_character(conn, player_id, character_id)
                .await?
                .ok_or(GameError::NotFoundOrForbidden),
            None => characters::lock_default_parent(conn, player_id)
                .await?
                .ok_or(GameError::NoOwnedParent),
        }
    }

    async fn create_in(
        conn: &mut PgConnection,
        player_id: i64,
        requested_parent: Option<i64>,
        name: &str,
        kind: &str,
    ) -> Result<PetRow, GameError> {
        lock_player(conn, player_id).await?;
        let character_id = Self::resolve_parent(conn, player_id, requested_parent).await?;
        Ok(pets::insert_pet(conn, character_id, name, kind).await?)
    }

    async fn update_in(
        conn: &mut PgConnection,
        player_id: i64,
        id: i64,
        name: &str,
        kind: &str,
    ) -> Result<PetRow, GameError> {
        lock_player(conn, player_id).await?;
        pets::update_pet(conn, player_id, id, name, kind)
            .await?
            .ok_or(GameError::NotFoundOrForbidden)
    }

    async fn delete_in(conn: &mut PgConnection, player_id: i64, id: i64) -> Result<(), GameError> {
        lock_player(conn, player_id).await?;
        if pets::delete_pet(conn, player_id, id).await? == 0 {
            return Err(GameError::NotFoundOrForbidden);
        }
        players::clear_active_pet(conn, player_id, &[id]).await?;
        Ok(())
    }

    async fn select_in(conn: &mut PgConnection, player_id: i64, id: i64) -> Result<(), GameError> {
        lock_player(conn, player_id).await?;
        if players::set_active_pet(conn, player_id, id).await? {
            Ok(())
        } else {
            Err(GameError::NotFoundOrForbidden)
        }
    }
}

#[async_trait]
impl OwnedRepository for Pets {
    type Entity = PetRow;
    type New = NewPet;
    type Changes = PetChanges;

    const KIND: &'static str = "pet";

    async fn list(&self, player_id: i64) -> Result<Vec<PetRow>, GameError> {
        let mut conn = self.pool.acquire().await?;
        Ok(pets::list_pets(&mut *conn, player_id).await?)
    }

    async fn get(&self, player_id: i64, id: i64) -> Result<PetRow, GameError> {
        let mut conn = self.pool.acquire().await?;
        pets::get_pet(&mut *conn, player_id, id)
            .await?
            .ok_or(GameError::NotFoundOrForbidden)
    }

    #[instrument(skip(self, attrs))]
    async fn create(&self, player_id: i64, attrs: NewPet) -> Result<PetRow, GameError> {
        let (name, kind) = validated(&attrs.name, &attrs.kind)?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        let result = Self::create_in(&mut *tx, player_id, attrs.character_id, &name, &kind).await;
        let row = transaction::finish(tx, result).await?;

        info!(pet_id = row.id, character_id = row.character_id, "pet created");
        Ok(row)
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, player_id: i64, id: i64, changes: PetChanges) -> Result<PetRow, GameError> {
        let (name, kind) = validated(&changes.name, &changes.kind)?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        let result = Self::update_in(&mut *tx, player_id, id, &name, &kind).await;
        transaction::finish(tx, result).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, player_id: i64, id: i64) -> Result<(), GameError> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        let result = Self::delete_in(&mut *tx, player_id, id).await;
        transaction::finish(tx, result).await?;

        info!("pet deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn select_active(&self, player_id: i64, id: i64) -> Result<(), GameError> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        let result = Self::select_in(&mut *tx, player_id, id).await;
        transaction::finish(tx, result).await?;

        info!("active pet selected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::unreachable_pool;

    #[test]
    fn new_pet_accepts_type_or_kind() {
        let a: NewPet = serde_json::from_str(r#"{"name":"Spark","type":"Fox"}"#).unwrap();
        let b: NewPet = serde_json::from_str(r#"{"name":"Spark","kind":"Fox","character_id":10}"#).unwrap();
        assert_eq!(a, NewPet::new("Spark", "Fox"));
        assert_eq!(b, NewPet::new("Spark", "Fox").under(10));
    }

    #[tokio::test]
    async fn invalid_attrs_fail_before_any_connection() {
        let repo = Pets::new(unreachable_pool());
        assert!(matches!(
            repo.create(1, NewPet::new("Spark", "  ")).await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            repo.update(1, 20, PetChanges::new("", "Fox")).await,
            Err(GameError::InvalidInput(_))
        ));
    }
}
