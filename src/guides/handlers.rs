use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{instrument, warn};

use super::library::Guide;
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct GuideList {
    pub guides: Vec<Guide>,
}

#[derive(Debug, Serialize)]
pub struct GuideContent {
    pub content: String,
}

pub fn guide_routes() -> Router<AppState> {
    Router::new()
        .route("/guides", get(list_guides))
        .route("/guides/:name", get(get_guide))
        .route("/guides/download/:name", get(download_guide))
}

#[instrument(skip(state))]
pub async fn list_guides(State(state): State<AppState>) -> Result<Json<GuideList>, ApiError> {
    let guides = state.guides.list().await?;
    Ok(Json(GuideList { guides }))
}

#[instrument(skip(state))]
pub async fn get_guide(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<GuideContent>, ApiError> {
    let (_, content) = find(&state, &name).await?;
    Ok(Json(GuideContent { content }))
}

#[instrument(skip(state))]
pub async fn download_guide(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let (filename, content) = find(&state, &name).await?;
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/markdown; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

async fn find(state: &AppState, name: &str) -> Result<(String, String), ApiError> {
    state.guides.read(name).await?.ok_or_else(|| {
        warn!(%name, "guide not found");
        ApiError::NotFound("guide".into())
    })
}
