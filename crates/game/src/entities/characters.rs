use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::{Connection, PgConnection};
use tracing::{info, instrument};

use db::models::CharacterRow;
use db::repository::{characters, players};
use db::DbPool;

use crate::entities::{lock_player, OwnedRepository};
use crate::validate::{self, CATEGORY_MAX, NAME_MAX};
use crate::{transaction, GameError};

/// Attributes supplied when creating or editing a character.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CharacterAttrs {
    pub name: String,
    pub class: String,
}

impl CharacterAttrs {
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self { name: name.into(), class: class.into() }
    }

    fn validated(&self) -> Result<(String, String), GameError> {
        Ok((
            validate::label("name", &self.name, NAME_MAX)?,
            validate::label("class", &self.class, CATEGORY_MAX)?,
        ))
    }
}

#[derive(Clone)]
pub struct Characters {
    pool: Arc<DbPool>,
}

impl Characters {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    async fn create_in(
        conn: &mut PgConnection,
        player_id: i64,
        name: &str,
        class: &str,
    ) -> Result<CharacterRow, GameError> {
        lock_player(conn, player_id).await?;
        Ok(characters::insert_character(conn, player_id, name, class).await?)
    }

    async fn update_in(
        conn: &mut PgConnection,
        player_id: i64,
        id: i64,
        name: &str,
        class: &str,
    ) -> Result<CharacterRow, GameError> {
        lock_player(conn, player_id).await?;
        characters::update_character(conn, player_id, id, name, class)
            .await?
            .ok_or(GameError::NotFoundOrForbidden)
    }

    /// Pets go with their character; the player's active references to any
    /// of the removed rows are cleared.
    async fn delete_in(conn: &mut PgConnection, player_id: i64, id: i64) -> Result<usize, GameError> {
        lock_player(conn, player_id).await?;
        let pet_ids = characters::delete_pets_of_character(conn, player_id, id).await?;
        if characters::delete_character(conn, player_id, id).await? == 0 {
            return Err(GameError::NotFoundOrForbidden);
        }
        players::clear_active_character(conn, player_id, id).await?;
        players::clear_active_pet(conn, player_id, &pet_ids).await?;
        Ok(pet_ids.len())
    }

    async fn select_in(conn: &mut PgConnection, player_id: i64, id: i64) -> Result<(), GameError> {
        lock_player(conn, player_id).await?;
        if players::set_active_character(conn, player_id, id).await? {
            Ok(())
        } else {
            Err(GameError::NotFoundOrForbidden)
        }
    }
}

#[async_trait]
impl OwnedRepository for Characters {
    type Entity = CharacterRow;
    type New = CharacterAttrs;
    type Changes = CharacterAttrs;

    const KIND: &'static str = "character";

    async fn list(&self, player_id: i64) -> Result<Vec<CharacterRow>, GameError> {
        let mut conn = self.pool.acquire().await?;
        Ok(characters::list_characters(&mut *conn, player_id).await?)
    }

    async fn get(&self, player_id: i64, id: i64) -> Result<CharacterRow, GameError> {
        let mut conn = self.pool.acquire().await?;
        characters::get_character(&mut *conn, player_id, id)
            .await?
            .ok_or(GameError::NotFoundOrForbidden)
    }

    #[instrument(skip(self, attrs))]
    async fn create(&self, player_id: i64, attrs: CharacterAttrs) -> Result<CharacterRow, GameError> {
        let (name, class) = attrs.validated()?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        let result = Self::create_in(&mut *tx, player_id, &name, &class).await;
        let row = transaction::finish(tx, result).await?;

        info!(character_id = row.id, "character created");
        Ok(row)
    }

    #[instrument(skip(self, changes))]
    async fn update(
        &self,
        player_id: i64,
        id: i64,
        changes: CharacterAttrs,
    ) -> Result<CharacterRow, GameError> {
        let (name, class) = changes.validated()?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        let result = Self::update_in(&mut *tx, player_id, id, &name, &class).await;
        transaction::finish(tx, result).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, player_id: i64, id: i64) -> Result<(), GameError> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        let result = Self::delete_in(&mut *tx, player_id, id).await;
        let pets_removed = transaction::finish(tx, result).await?;

        info!(pets_removed, "character deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn select_active(&self, player_id: i64, id: i64) -> Result<(), GameError> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        let result = Self::select_in(&mut *tx, player_id, id).await;
        transaction::finish(tx, result).await?;

        info!("active character selected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::unreachable_pool;

    #[test]
    fn attrs_are_trimmed() {
        let attrs = CharacterAttrs::new("  Thorn ", " Warrior");
        assert_eq!(attrs.validated().unwrap(), ("Thorn".to_owned(), "Warrior".to_owned()));
    }

    #[tokio::test]
    async fn invalid_attrs_fail_before_any_connection() {
        let repo = Characters::new(unreachable_pool());
        assert!(matches!(
            repo.create(1, CharacterAttrs::new("", "Warrior")).await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            repo.update(1, 10, CharacterAttrs::new("Thorn", "x".repeat(CATEGORY_MAX + 1))).await,
            Err(GameError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_store_surfaces_as_unavailable() {
        let repo = Characters::new(unreachable_pool());
        assert!(matches!(repo.list(1).await, Err(GameError::BackingStoreUnavailable)));
        assert!(matches!(repo.delete(1, 10).await, Err(GameError::BackingStoreUnavailable)));
    }
}
