use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod library;

pub use library::GuideLibrary;

pub fn router() -> Router<AppState> {
    handlers::guide_routes()
}
