use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, OkResponse, RegisterRequest, SessionStatus},
        extractors::MaybeSession,
        services::{login_with_demo, login_with_store, register_user},
        session::{self, Session},
    },
    error::ApiError,
    state::{AppState, AuthBackend},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session_check))
        .route("/session-check", get(session_check))
        .route("/register", post(register))
}

#[instrument(skip(state, handle, payload))]
pub async fn login(
    State(state): State<AppState>,
    handle: tower_sessions::Session,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let result = match payload {
        Ok(Json(req)) => authenticate(&state, &req).await,
        Err(rejection) => Err(ApiError::validation(rejection.body_text())),
    };

    match result {
        Ok(identity) => {
            session::start(&handle, &identity).await.map_err(|e| {
                error!(error = %e, "session start failed");
                ApiError::Internal(e)
            })?;
            Ok(Json(LoginResponse {
                ok: true,
                username: identity.username,
                is_admin: identity.is_admin,
            }))
        }
        // A failed attempt also drops whatever session the client held before.
        Err(e) => {
            if let Err(flush) = session::end(&handle).await {
                warn!(error = %flush, "session flush after failed login");
            }
            Err(e)
        }
    }
}

async fn authenticate(state: &AppState, req: &LoginRequest) -> Result<Session, ApiError> {
    match &state.auth {
        AuthBackend::Store(store) => {
            login_with_store(store.as_ref(), state.config.admin_code.as_deref(), req).await
        }
        AuthBackend::Demo(demo) => login_with_demo(demo, req),
    }
}

#[instrument(skip_all)]
pub async fn session_check(MaybeSession(session): MaybeSession) -> Response {
    match session {
        Some(s) => Json(SessionStatus {
            logged_in: true,
            username: Some(s.username),
            is_admin: Some(s.is_admin),
        })
        .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(SessionStatus {
                logged_in: false,
                username: None,
                is_admin: None,
            }),
        )
            .into_response(),
    }
}

#[instrument(skip_all)]
pub async fn logout(handle: tower_sessions::Session) -> Json<OkResponse> {
    if let Err(e) = session::end(&handle).await {
        warn!(error = %e, "session flush failed");
    }
    Json(OkResponse { ok: true })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let Json(req) = payload.map_err(|r| ApiError::validation(r.body_text()))?;
    let store = state.users()?;
    register_user(store.as_ref(), req).await?;
    Ok(Json(OkResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logged_out_status_omits_identity() {
        let json = serde_json::to_value(SessionStatus {
            logged_in: false,
            username: None,
            is_admin: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "logged_in": false }));
    }

    #[test]
    fn login_response_serialization() {
        let json = serde_json::to_value(LoginResponse {
            ok: true,
            username: "alice".into(),
            is_admin: false,
        })
        .unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["username"], "alice");
        assert_eq!(json["is_admin"], false);
        assert!(json.get("token").is_none());
    }
}
