//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no domain behaviour. Column
//! names in the schema are Spanish (`jugador`, `personaje`, `mascota`); every
//! query aliases them to the field names below, so a shape mismatch fails at
//! decode time instead of silently mis-reading a column.
//!
//! No row type carries `contrasena_hash`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// jugador
// ---------------------------------------------------------------------------

/// A player row, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlayerRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub experience: i32,
    pub level: i32,
    /// Weak reference; may dangle.
    pub active_character_id: Option<i64>,
    /// Weak reference; may dangle.
    pub active_pet_id: Option<i64>,
}

/// What a successful credential check yields.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PlayerIdentityRow {
    pub id: i64,
    pub username: String,
}

/// One line of the public player list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlayerRankingRow {
    pub id: i64,
    pub username: String,
    pub level: i32,
    pub experience: i32,
}

// ---------------------------------------------------------------------------
// personaje
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CharacterRow {
    pub id: i64,
    pub player_id: i64,
    pub name: String,
    pub class: String,
    pub level: i32,
}

// ---------------------------------------------------------------------------
// mascota
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PetRow {
    pub id: i64,
    pub character_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub level: i32,
}

// ---------------------------------------------------------------------------
// session snapshot
// ---------------------------------------------------------------------------

/// Flat result of the player + active character + active pet join.
///
/// The character and pet columns are NULL when the reference is unset or
/// does not resolve through the player's ownership chain.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub experience: i32,
    pub level: i32,
    pub active_character_id: Option<i64>,
    pub active_pet_id: Option<i64>,

    pub character_id: Option<i64>,
    pub character_name: Option<String>,
    pub character_class: Option<String>,
    pub character_level: Option<i32>,

    pub pet_id: Option<i64>,
    pub pet_character_id: Option<i64>,
    pub pet_name: Option<String>,
    pub pet_kind: Option<String>,
    pub pet_level: Option<i32>,
}

/// A player together with whatever active entities actually resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub player: PlayerRow,
    pub character: Option<CharacterRow>,
    pub pet: Option<PetRow>,
}

impl From<SessionRow> for SessionSnapshot {
    fn from(row: SessionRow) -> Self {
        let character = match (
            row.character_id,
            row.character_name,
            row.character_class,
            row.character_level,
        ) {
            (Some(id), Some(name), Some(class), Some(level)) => Some(CharacterRow {
                id,
                player_id: row.id,
                name,
                class,
                level,
            }),
            _ => None,
        };

        let pet = match (
            row.pet_id,
            row.pet_character_id,
            row.pet_name,
            row.pet_kind,
            row.pet_level,
        ) {
            (Some(id), Some(character_id), Some(name), Some(kind), Some(level)) => Some(PetRow {
                id,
                character_id,
                name,
                kind,
                level,
            }),
            _ => None,
        };

        Self {
            player: PlayerRow {
                id: row.id,
                username: row.username,
                email: row.email,
                experience: row.experience,
                level: row.level,
                active_character_id: row.active_character_id,
                active_pet_id: row.active_pet_id,
            },
            character,
            pet,
        }
    }
}
