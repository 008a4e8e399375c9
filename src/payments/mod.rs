use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod webhook;

pub fn router() -> Router<AppState> {
    handlers::payment_routes()
}
