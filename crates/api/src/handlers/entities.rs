//! Handlers shared by every owned entity kind.
//!
//! Each route is instantiated per repository, e.g. `list::<Characters>`.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use tracing::debug;

use game::{Characters, Game, OwnedRepository, Pets};

use crate::extract::{ApiJson, ApiPath};
use crate::{ApiError, AppState, AuthPlayer};

/// Picks a repository out of the shared [`Game`].
pub trait Resource: OwnedRepository + 'static {
    fn from_game(game: &Game) -> &Self;
}

impl Resource for Characters {
    fn from_game(game: &Game) -> &Self {
        &game.characters
    }
}

impl Resource for Pets {
    fn from_game(game: &Game) -> &Self {
        &game.pets
    }
}

pub async fn list<R: Resource>(
    State(state): State<AppState>,
    player: AuthPlayer,
) -> Result<Json<Vec<R::Entity>>, ApiError> {
    let items = R::from_game(&state.game).list(player.id()).await?;
    debug!(kind = R::KIND, count = items.len(), "listed");
    Ok(Json(items))
}

pub async fn get<R: Resource>(
    State(state): State<AppState>,
    player: AuthPlayer,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<R::Entity>, ApiError> {
    Ok(Json(R::from_game(&state.game).get(player.id(), id).await?))
}

pub async fn create<R: Resource>(
    State(state): State<AppState>,
    player: AuthPlayer,
    ApiJson(payload): ApiJson<R::New>,
) -> Result<(StatusCode, Json<R::Entity>), ApiError> {
    let created = R::from_game(&state.game).create(player.id(), payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update<R: Resource>(
    State(state): State<AppState>,
    player: AuthPlayer,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<R::Changes>,
) -> Result<Json<R::Entity>, ApiError> {
    Ok(Json(R::from_game(&state.game).update(player.id(), id, payload).await?))
}

pub async fn delete<R: Resource>(
    State(state): State<AppState>,
    player: AuthPlayer,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    R::from_game(&state.game).delete(player.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn select<R: Resource>(
    State(state): State<AppState>,
    player: AuthPlayer,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    R::from_game(&state.game).select_active(player.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
