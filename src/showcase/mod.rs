use crate::state::AppState;
use axum::Router;

pub mod data;
pub mod handlers;

pub use data::Showcase;

pub fn router() -> Router<AppState> {
    handlers::showcase_routes()
}
