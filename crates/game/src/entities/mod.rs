//! Ownership-scoped repositories for the entities a player owns.
//!
//! Characters are owned directly; pets are owned through their character.
//! Every mutation runs in one transaction that first locks the player row,
//! then performs statements whose WHERE clauses carry the ownership check, so
//! there is no gap between checking and writing.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgConnection;

use db::repository::players;

use crate::GameError;

pub mod characters;
pub mod pets;

pub use characters::{CharacterAttrs, Characters};
pub use pets::{NewPet, PetChanges, Pets};

/// The operations shared by every entity kind a player owns.
#[async_trait]
pub trait OwnedRepository: Send + Sync {
    type Entity: Serialize + Send;
    type New: DeserializeOwned + Send;
    type Changes: DeserializeOwned + Send;

    /// Used in log fields.
    const KIND: &'static str;

    /// All entities reachable from `player_id`, ordered by id.
    async fn list(&self, player_id: i64) -> Result<Vec<Self::Entity>, GameError>;

    /// Read-only lookup of one reachable entity.
    async fn get(&self, player_id: i64, id: i64) -> Result<Self::Entity, GameError>;

    /// Create an entity at level 1.
    async fn create(&self, player_id: i64, attrs: Self::New) -> Result<Self::Entity, GameError>;

    async fn update(
        &self,
        player_id: i64,
        id: i64,
        changes: Self::Changes,
    ) -> Result<Self::Entity, GameError>;

    /// Fails with [`GameError::NotFoundOrForbidden`] instead of succeeding on
    /// zero affected rows.
    async fn delete(&self, player_id: i64, id: i64) -> Result<(), GameError>;

    /// Make `id` the player's active entity of this kind.
    async fn select_active(&self, player_id: i64, id: i64) -> Result<(), GameError>;
}

/// Row-lock the acting player; every mutation starts here.
pub(crate) async fn lock_player(conn: &mut PgConnection, player_id: i64) -> Result<(), GameError> {
    if players::lock_player(conn, player_id).await? {
        Ok(())
    } else {
        Err(GameError::UnknownPlayer)
    }
}
