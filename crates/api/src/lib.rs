//! `api` crate — HTTP layer over the game core.
//!
//! Exposes:
//!   POST   /api/auth/register
//!   POST   /api/auth/login
//!   POST   /api/auth/logout
//!   GET    /api/session
//!   POST   /api/session/experience   (only with experience grants enabled)
//!   GET    /api/players
//!   GET    /api/health
//!   GET    /api/{characters,pets}
//!   POST   /api/{characters,pets}
//!   GET    /api/{characters,pets}/{id}
//!   PUT    /api/{characters,pets}/{id}
//!   DELETE /api/{characters,pets}/{id}
//!   POST   /api/{characters,pets}/{id}/select
//!
//! Everything except register, login, the player list and health needs an
//! `Authorization: Bearer <token>` header obtained from login.
//!
//! `POST /api/session/experience` lets a player award themselves experience.
//! It exists for trusted deployments (local play, a game server fronting the
//! API) and is left off the router unless
//! [`AppState::allow_experience_grants`] is set.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use game::{Characters, Game, Pets};

pub use auth::{AuthPlayer, SessionStore};
pub use error::ApiError;

use handlers::{entities, health, players, session};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub game: Game,
    pub sessions: Arc<SessionStore>,
    /// Mount `POST /api/session/experience`.
    pub allow_experience_grants: bool,
}

impl AppState {
    pub fn new(game: Game) -> Self {
        Self::with_sessions(game, SessionStore::default())
    }

    pub fn with_sessions(game: Game, sessions: SessionStore) -> Self {
        Self { game, sessions: Arc::new(sessions), allow_experience_grants: false }
    }
}

pub fn router(state: AppState) -> Router {
    let mut routes = Router::new();
    if state.allow_experience_grants {
        routes = routes.route("/api/session/experience", post(session::grant_experience));
    }

    routes
        .route("/api/auth/register", post(session::register))
        .route("/api/auth/login", post(session::login))
        .route("/api/auth/logout", post(session::logout))
        .route("/api/session", get(session::current))
        .route("/api/players", get(players::list))
        .route("/api/health", get(health::check))
        .route(
            "/api/characters",
            get(entities::list::<Characters>).post(entities::create::<Characters>),
        )
        .route(
            "/api/characters/:id",
            get(entities::get::<Characters>)
                .put(entities::update::<Characters>)
                .delete(entities::delete::<Characters>),
        )
        .route("/api/characters/:id/select", post(entities::select::<Characters>))
        .route("/api/pets", get(entities::list::<Pets>).post(entities::create::<Pets>))
        .route(
            "/api/pets/:id",
            get(entities::get::<Pets>)
                .put(entities::update::<Pets>)
                .delete(entities::delete::<Pets>),
        )
        .route("/api/pets/:id/select", post(entities::select::<Pets>))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `bind` and serve until Ctrl-C.
pub async fn serve(bind: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use db::{DbPool, PoolConfig, RetryPolicy};
    use game::Game;

    use crate::AppState;

    /// State whose store is a closed local port.
    pub(crate) fn offline_state() -> AppState {
        let mut config = PoolConfig::new("postgres://videojuego@127.0.0.1:1/videojuego");
        config.require_tls = false;
        config.acquire_timeout = Duration::from_millis(250);
        config.retry = RetryPolicy { max_attempts: 1, delay: Duration::ZERO };
        let pool = Arc::new(DbPool::from_config(&config).expect("valid config"));
        AppState::new(Game::new(pool))
    }
}
