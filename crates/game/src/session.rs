//! Player session resolver: the aggregate view a logged-in player sees.

use std::sync::Arc;

use serde::Serialize;
use sqlx::{Connection, PgConnection};
use tracing::{info, instrument, warn};

use db::models::{CharacterRow, PetRow, PlayerRankingRow, PlayerRow, SessionSnapshot};
use db::repository::players::{self, PlayerOrder};
use db::DbPool;

use crate::{transaction, GameError};

/// Experience needed to go up one level.
pub const EXPERIENCE_PER_LEVEL: i32 = 100;

pub const LEADERBOARD_MAX: u32 = 100;

/// Experience earned inside the current level (0..100).
pub fn level_progress(experience: i32) -> i32 {
    experience.rem_euclid(EXPERIENCE_PER_LEVEL)
}

/// Experience after adding `amount` to `current`.
///
/// # Errors
/// [`GameError::InvalidInput`] for a negative amount or a total past the
/// storable maximum.
pub fn add_experience(current: i32, amount: i32) -> Result<i32, GameError> {
    if amount < 0 {
        return Err(GameError::InvalidInput("experience cannot be negative".into()));
    }
    current
        .checked_add(amount)
        .ok_or_else(|| GameError::InvalidInput("experience would exceed the maximum".into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSummary {
    pub id: i64,
    pub username: String,
    pub experience: i32,
    pub level: i32,
    pub level_progress: i32,
}

impl From<PlayerRow> for PlayerSummary {
    fn from(row: PlayerRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            experience: row.experience,
            level: row.level,
            level_progress: level_progress(row.experience),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterSummary {
    pub id: i64,
    pub name: String,
    pub class: String,
    pub level: i32,
}

impl From<CharacterRow> for CharacterSummary {
    fn from(row: CharacterRow) -> Self {
        Self { id: row.id, name: row.name, class: row.class, level: row.level }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PetSummary {
    pub id: i64,
    pub character_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub level: i32,
}

impl From<PetRow> for PetSummary {
    fn from(row: PetRow) -> Self {
        Self {
            id: row.id,
            character_id: row.character_id,
            name: row.name,
            kind: row.kind,
            level: row.level,
        }
    }
}

/// Everything the lobby needs. `None` means "nothing selected", which also
/// covers references that no longer resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub player: PlayerSummary,
    pub active_character: Option<CharacterSummary>,
    pub active_pet: Option<PetSummary>,
}

impl From<SessionSnapshot> for SessionView {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            player: snapshot.player.into(),
            active_character: snapshot.character.map(Into::into),
            active_pet: snapshot.pet.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRanking {
    pub id: i64,
    pub username: String,
    pub level: i32,
}

impl From<PlayerRankingRow> for PlayerRanking {
    fn from(row: PlayerRankingRow) -> Self {
        Self { id: row.id, username: row.username, level: row.level }
    }
}

#[derive(Clone)]
pub struct SessionResolver {
    pool: Arc<DbPool>,
}

impl SessionResolver {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Assemble the session view for `player_id`.
    ///
    /// # Errors
    /// [`GameError::UnknownPlayer`] if the player no longer exists; the
    /// caller should drop the session and ask for a new login.
    #[instrument(skip(self))]
    pub async fn resolve(&self, player_id: i64) -> Result<SessionView, GameError> {
        let mut conn = self.pool.acquire().await?;
        let snapshot = players::session_snapshot(&mut *conn, player_id)
            .await?
            .ok_or(GameError::UnknownPlayer)?;

        if snapshot.player.active_character_id.is_some() && snapshot.character.is_none() {
            warn!(player_id, "active character reference does not resolve, treating as none");
        }
        if snapshot.player.active_pet_id.is_some() && snapshot.pet.is_none() {
            warn!(player_id, "active pet reference does not resolve, treating as none");
        }

        Ok(snapshot.into())
    }

    /// Add experience and recompute the level.
    #[instrument(skip(self))]
    pub async fn grant_experience(
        &self,
        player_id: i64,
        amount: i32,
    ) -> Result<PlayerSummary, GameError> {
        add_experience(0, amount)?;

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        let result = Self::grant_in(&mut *tx, player_id, amount).await;
        let row = transaction::finish(tx, result).await?;

        info!(player_id, experience = row.experience, level = row.level, "experience granted");
        Ok(row.into())
    }

    async fn grant_in(
        conn: &mut PgConnection,
        player_id: i64,
        amount: i32,
    ) -> Result<PlayerRow, GameError> {
        let current = players::lock_experience(conn, player_id)
            .await?
            .ok_or(GameError::UnknownPlayer)?;
        add_experience(current, amount)?;
        players::grant_experience(conn, player_id, amount)
            .await?
            .ok_or(GameError::UnknownPlayer)
    }

    /// Public player list. `limit` is clamped to 1..=100.
    pub async fn leaderboard(
        &self,
        limit: u32,
        order: PlayerOrder,
    ) -> Result<Vec<PlayerRanking>, GameError> {
        let limit = limit.clamp(1, LEADERBOARD_MAX);
        let mut conn = self.pool.acquire().await?;
        let rows = players::list_rankings(&mut *conn, i64::from(limit), order).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::unreachable_pool;

    fn player(experience: i32) -> PlayerRow {
        PlayerRow {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            experience,
            level: experience / EXPERIENCE_PER_LEVEL + 1,
            active_character_id: Some(10),
            active_pet_id: Some(20),
        }
    }

    #[test]
    fn progress_is_experience_mod_100() {
        assert_eq!(level_progress(0), 0);
        assert_eq!(level_progress(99), 99);
        assert_eq!(level_progress(100), 0);
        assert_eq!(level_progress(250), 50);
    }

    #[test]
    fn dangling_references_render_as_none() {
        let view = SessionView::from(SessionSnapshot {
            player: player(250),
            character: None,
            pet: None,
        });

        assert_eq!(view.player.level, 3);
        assert_eq!(view.player.level_progress, 50);
        assert_eq!(view.active_character, None);
        assert_eq!(view.active_pet, None);

        let json = serde_json::to_value(&view).expect("serialize");
        assert!(json["active_character"].is_null());
        assert!(json["active_pet"].is_null());
        assert!(json["player"].get("email").is_none());
    }

    #[test]
    fn resolved_entities_are_summarised() {
        let view = SessionView::from(SessionSnapshot {
            player: player(5),
            character: Some(CharacterRow {
                id: 10,
                player_id: 1,
                name: "Thorn".into(),
                class: "Warrior".into(),
                level: 1,
            }),
            pet: Some(PetRow {
                id: 20,
                character_id: 10,
                name: "Spark".into(),
                kind: "Fox".into(),
                level: 1,
            }),
        });

        assert_eq!(view.active_character.as_ref().map(|c| c.id), Some(10));
        let json = serde_json::to_value(&view).expect("serialize");
        assert_eq!(json["active_pet"]["type"], "Fox");
    }

    #[test]
    fn experience_totals_stay_storable() {
        assert_eq!(add_experience(10, 90).unwrap(), 100);
        assert_eq!(add_experience(i32::MAX, 0).unwrap(), i32::MAX);
        assert!(matches!(add_experience(10, i32::MAX), Err(GameError::InvalidInput(_))));
        assert!(matches!(add_experience(0, -1), Err(GameError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn negative_experience_is_rejected_before_connecting() {
        let resolver = SessionResolver::new(unreachable_pool());
        assert!(matches!(
            resolver.grant_experience(1, -5).await,
            Err(GameError::InvalidInput(_))
        ));
    }
}
