use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::client::ChatMessage;
use crate::{auth::extractors::RequireSession, error::ApiError, state::AppState};

const MAX_HISTORY: usize = 20;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

#[instrument(skip(state, session, payload))]
pub async fn chat(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload.map_err(|r| ApiError::validation(r.body_text()))?;
    if req.message.trim().is_empty() {
        return Err(ApiError::validation("message is required"));
    }
    let client = state
        .chat
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("chat assistant is not configured".into()))?;

    let mut messages = conversation(req.history);
    messages.push(ChatMessage::user(req.message));

    let reply = client
        .complete(messages)
        .await
        .map_err(|e| ApiError::Upstream(format!("{e:#}")))?;

    info!(username = %session.username, "chat reply relayed");
    Ok(Json(ChatResponse { reply }))
}

/// Keeps the tail of the history and drops roles the upstream would reject.
fn conversation(history: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let kept: Vec<ChatMessage> = history
        .into_iter()
        .filter(|m| matches!(m.role.as_str(), "user" | "assistant"))
        .collect();
    let skip = kept.len().saturating_sub(MAX_HISTORY);
    kept.into_iter().skip(skip).collect()
}
