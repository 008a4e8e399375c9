use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, instrument};

use super::webhook::{Event, CHECKOUT_COMPLETED, SIGNATURE_HEADER};
use crate::{auth::services::complete_payment, error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

pub fn payment_routes() -> Router<AppState> {
    Router::new().route("/payment-webhook", post(payment_webhook))
}

/// Verification happens on the raw body; nothing is parsed or written until it passes.
#[instrument(skip_all)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let store = state.users()?;
    let verifier = state
        .webhook
        .as_ref()
        .ok_or_else(|| ApiError::InvalidWebhook("no webhook secret configured".into()))?;

    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    verifier
        .verify(signature, &body)
        .map_err(|e| ApiError::InvalidWebhook(e.to_string()))?;

    let event: Event = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidWebhook(format!("body is not an event: {e}")))?;

    if event.kind != CHECKOUT_COMPLETED {
        debug!(kind = %event.kind, "ignoring webhook event");
        return Ok(Json(WebhookAck { received: true }));
    }

    if let Some(email) = event.customer_email() {
        complete_payment(store.as_ref(), email).await?;
    } else {
        debug!("checkout completed without customer email");
    }

    Ok(Json(WebhookAck { received: true }))
}
