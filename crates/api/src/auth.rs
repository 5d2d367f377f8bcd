//! Bearer-token sessions.
//!
//! A token maps to the two values a session carries: player id and username.
//! The table lives in memory; restarting the server logs everyone out.

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use parking_lot::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use game::PlayerIdentity;

use crate::{ApiError, AppState};

/// Idle time after which a token stops working.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Open tokens one player may hold; logging in again past this evicts the
/// least recently used one.
pub const MAX_SESSIONS_PER_PLAYER: usize = 8;

#[derive(Debug)]
struct Session {
    identity: PlayerIdentity,
    last_seen: Instant,
}

#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    tokens: RwLock<HashMap<String, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, tokens: RwLock::new(HashMap::new()) }
    }

    /// Open a session and return its token. Expired sessions are swept first.
    pub fn issue(&self, identity: PlayerIdentity) -> String {
        let now = Instant::now();
        let token = Uuid::new_v4().simple().to_string();

        let mut tokens = self.tokens.write();
        tokens.retain(|_, s| now.duration_since(s.last_seen) < self.ttl);

        let mut own: Vec<(&String, Instant)> = tokens
            .iter()
            .filter(|(_, s)| s.identity.id == identity.id)
            .map(|(t, s)| (t, s.last_seen))
            .collect();
        if own.len() >= MAX_SESSIONS_PER_PLAYER {
            own.sort_by_key(|(_, seen)| *seen);
            let evict: Vec<String> = own[..=own.len() - MAX_SESSIONS_PER_PLAYER]
                .iter()
                .map(|(t, _)| (*t).clone())
                .collect();
            for t in evict {
                tokens.remove(&t);
            }
        }

        tokens.insert(token.clone(), Session { identity, last_seen: now });
        token
    }

    /// Resolve a live token and mark it as just used.
    pub fn lookup(&self, token: &str) -> Option<PlayerIdentity> {
        let now = Instant::now();
        let mut tokens = self.tokens.write();
        let session = tokens.get_mut(token)?;
        if now.duration_since(session.last_seen) >= self.ttl {
            tokens.remove(token);
            return None;
        }
        session.last_seen = now;
        Some(session.identity.clone())
    }

    /// Returns whether the token was live.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.write().remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The authenticated caller. Rejects with [`ApiError::Unauthenticated`].
#[derive(Debug, Clone)]
pub struct AuthPlayer {
    pub token: String,
    pub identity: PlayerIdentity,
}

impl AuthPlayer {
    pub fn id(&self) -> i64 {
        self.identity.id
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthPlayer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer(parts).ok_or(ApiError::Unauthenticated)?;
        let identity = state.sessions.lookup(token).ok_or(ApiError::Unauthenticated)?;
        Ok(Self { token: token.to_owned(), identity })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn alice() -> PlayerIdentity {
        PlayerIdentity { id: 1, username: "alice".into() }
    }

    fn player(id: i64) -> PlayerIdentity {
        PlayerIdentity { id, username: format!("player{id}") }
    }

    #[test]
    fn tokens_are_unique_and_revocable() {
        let store = SessionStore::default();
        let a = store.issue(alice());
        let b = store.issue(alice());
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);

        assert_eq!(store.lookup(&a), Some(alice()));
        assert!(store.revoke(&a));
        assert!(!store.revoke(&a));
        assert_eq!(store.lookup(&a), None);
        assert_eq!(store.lookup(&b), Some(alice()));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_tokens_expire() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.issue(alice());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(store.lookup(&token), Some(alice()));

        // The lookup above reset the idle clock.
        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(store.lookup(&token), Some(alice()));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(store.lookup(&token), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_tokens_are_swept_on_login() {
        let store = SessionStore::new(Duration::from_secs(60));
        for id in 0..50 {
            store.issue(player(id));
        }
        assert_eq!(store.len(), 50);

        tokio::time::advance(Duration::from_secs(61)).await;
        store.issue(player(99));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_logins_are_capped_per_player() {
        let store = SessionStore::default();
        let first = store.issue(alice());
        tokio::time::advance(Duration::from_secs(1)).await;
        let others: Vec<_> = (0..100)
            .map(|_| store.issue(alice()))
            .collect();
        store.issue(player(2));

        assert_eq!(store.len(), MAX_SESSIONS_PER_PLAYER + 1);
        assert_eq!(store.lookup(&first), None);
        assert_eq!(store.lookup(others.last().unwrap()), Some(alice()));
    }

    #[test]
    fn bearer_header_parsing() {
        let parts = |value: &str| {
            Request::get("/")
                .header(header::AUTHORIZATION, value)
                .body(())
                .unwrap()
                .into_parts()
                .0
        };
        assert_eq!(bearer(&parts("Bearer abc")), Some("abc"));
        assert_eq!(bearer(&parts("Bearer   ")), None);
        assert_eq!(bearer(&parts("Basic abc")), None);

        let (bare, _) = Request::get("/").body(()).unwrap().into_parts();
        assert_eq!(bearer(&bare), None);
    }
}
