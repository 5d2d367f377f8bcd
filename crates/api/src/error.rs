//! HTTP error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::error::Error as _;
use thiserror::Error;
use tracing::{error, warn};

use game::GameError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("login required")]
    Unauthenticated,

    /// The request could not be parsed.
    #[error("{0}")]
    BadRequest(&'static str),

    #[error(transparent)]
    Game(#[from] GameError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Game(err) => match err {
                GameError::NotFoundOrForbidden => StatusCode::NOT_FOUND,
                GameError::InvalidCredentials | GameError::UnknownPlayer => StatusCode::FORBIDDEN,
                GameError::InvalidInput(_)
                | GameError::DuplicateIdentifier
                | GameError::NoOwnedParent => StatusCode::BAD_REQUEST,
                GameError::BackingStoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                GameError::RegistrationFailed | GameError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Game(GameError::Store(inner)) => {
                error!(error = %inner, source = ?inner.source(), "request failed in storage")
            }
            Self::Game(GameError::BackingStoreUnavailable) => warn!("request failed: store unavailable"),
            _ => {}
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
