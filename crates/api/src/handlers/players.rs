use axum::{extract::State, Json};
use serde::Deserialize;

use game::{PlayerOrder, PlayerRanking};

use crate::extract::ApiQuery;
use crate::{ApiError, AppState};

const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    /// `rank` (default) or `id`.
    #[serde(default)]
    pub order: PlayerOrder,
}

/// Public player list, highest level first unless `order=id`.
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<PlayerRanking>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.game.sessions.leaderboard(limit, query.order).await?))
}
