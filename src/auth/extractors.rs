use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::session::{self, Session};
use crate::error::ApiError;

/// The caller's session if one is bound to the request's cookie. Missing,
/// expired, logged-out and unknown ids all come out as `None`.
pub struct MaybeSession(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let handle = match tower_sessions::Session::from_request_parts(parts, state).await {
            Ok(handle) => handle,
            Err((_, reason)) => {
                warn!(reason, "session layer unavailable");
                return Ok(MaybeSession(None));
            }
        };
        match session::current(&handle).await {
            Ok(session) => Ok(MaybeSession(session)),
            Err(e) => {
                warn!(error = %e, "session load failed");
                Ok(MaybeSession(None))
            }
        }
    }
}

/// Rejects with 401 unless a session is present.
pub struct RequireSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let MaybeSession(session) = MaybeSession::from_request_parts(parts, state)
            .await
            .unwrap_or(MaybeSession(None));
        session.map(RequireSession).ok_or(ApiError::Unauthorized)
    }
}
