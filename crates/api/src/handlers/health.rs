use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Always 200; the body says whether the store answered.
pub async fn check(State(state): State<AppState>) -> Json<Value> {
    let status = state.game.liveness.ping().await;
    Json(json!({ "status": status }))
}
