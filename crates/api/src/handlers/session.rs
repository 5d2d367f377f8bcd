use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use game::{GameError, PlayerIdentity, PlayerSummary, RegisteredPlayer, SessionView};

use crate::extract::ApiJson;
use crate::{ApiError, AppState, AuthPlayer};

#[derive(Debug, Deserialize)]
pub struct RegisterDto {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub player: PlayerIdentity,
}

#[derive(Debug, Deserialize)]
pub struct ExperienceDto {
    pub amount: i32,
}

/// Registration does not open a session.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterDto>,
) -> Result<(StatusCode, Json<RegisteredPlayer>), ApiError> {
    let player = state
        .game
        .credentials
        .register(&payload.username, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(player)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginDto>,
) -> Result<Json<LoginResponse>, ApiError> {
    let player = state.game.credentials.verify(&payload.email, &payload.password).await?;
    let token = state.sessions.issue(player.clone());
    info!(player_id = player.id, sessions = state.sessions.len(), "session opened");
    Ok(Json(LoginResponse { token, player }))
}

pub async fn logout(State(state): State<AppState>, player: AuthPlayer) -> StatusCode {
    state.sessions.revoke(&player.token);
    info!(player_id = player.id(), "session closed");
    StatusCode::NO_CONTENT
}

/// The lobby view. A session whose player is gone is closed on the spot.
pub async fn current(
    State(state): State<AppState>,
    player: AuthPlayer,
) -> Result<Json<SessionView>, ApiError> {
    match state.game.sessions.resolve(player.id()).await {
        Ok(view) => Ok(Json(view)),
        Err(GameError::UnknownPlayer) => {
            state.sessions.revoke(&player.token);
            Err(GameError::UnknownPlayer.into())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn grant_experience(
    State(state): State<AppState>,
    player: AuthPlayer,
    ApiJson(payload): ApiJson<ExperienceDto>,
) -> Result<Json<PlayerSummary>, ApiError> {
    let summary = state.game.sessions.grant_experience(player.id(), payload.amount).await?;
    Ok(Json(summary))
}
