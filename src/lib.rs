pub mod app;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod guides;
pub mod payments;
pub mod showcase;
pub mod state;

pub use app::build_app;
pub use state::AppState;
