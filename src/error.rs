use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::auth::repo_types::StoreError;

/// Every failure a handler can surface. The client only ever sees the kind
/// and a fixed message; internal detail goes to the log.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("not logged in")]
    Unauthorized,

    #[error("admin code required")]
    AdminCodeRequired,

    #[error("payment required")]
    PaymentRequired,

    #[error("{0} not found")]
    NotFound(String),

    #[error("username or email already registered")]
    Duplicate,

    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),

    #[error("upstream service failed: {0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::AdminCodeRequired | ApiError::PaymentRequired => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Duplicate => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "ValidationError",
            ApiError::InvalidCredentials => "InvalidCredentials",
            ApiError::Unauthorized => "Unauthorized",
            ApiError::AdminCodeRequired => "AdminCodeRequired",
            ApiError::PaymentRequired => "PaymentRequired",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Duplicate => "DuplicateError",
            ApiError::InvalidWebhook(_) => "InvalidWebhook",
            ApiError::Upstream(_) => "UpstreamError",
            ApiError::Unavailable(_) => "Unavailable",
            ApiError::Internal(_) => "InternalError",
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                "An internal error occurred".into()
            }
            ApiError::Upstream(detail) => {
                warn!(%detail, "upstream call failed");
                "Upstream service is unavailable".into()
            }
            ApiError::InvalidWebhook(detail) => {
                warn!(%detail, "webhook rejected");
                "Invalid webhook payload".into()
            }
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => ApiError::Duplicate,
            StoreError::Other(e) => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            ok: false,
            error: self.kind(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_share_status_and_kind() {
        let err = ApiError::InvalidCredentials;
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind(), "InvalidCredentials");
    }

    #[test]
    fn policy_failures_are_forbidden_but_distinct() {
        assert_eq!(ApiError::AdminCodeRequired.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::PaymentRequired.status(), StatusCode::FORBIDDEN);
        assert_ne!(
            ApiError::AdminCodeRequired.kind(),
            ApiError::PaymentRequired.kind()
        );
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused on 10.0.0.5"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("10.0.0.5"));
    }

    #[test]
    fn store_duplicate_maps_to_conflict() {
        let err: ApiError = StoreError::Duplicate.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.kind(), "DuplicateError");
    }
}
