use serde::{Deserialize, Serialize};
use time::Duration;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use crate::config::SessionConfig;

pub const SESSION_COOKIE: &str = "backoffice_session";

/// Key the authenticated identity is stored under in the server-side record.
const USER_KEY: &str = "user";

/// An authenticated session as seen by handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub is_admin: bool,
}

/// Session records live in process memory; the cookie only carries a random id,
/// so there is nothing on the client side to forge or edit.
pub fn session_layer(cfg: &SessionConfig, store: MemoryStore) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_http_only(true)
        .with_secure(cfg.cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_path("/")
        .with_expiry(Expiry::OnInactivity(Duration::minutes(cfg.ttl_minutes)))
}

/// Reads the identity from the request's session, if one was stored.
pub async fn current(handle: &tower_sessions::Session) -> anyhow::Result<Option<Session>> {
    Ok(handle.get::<Session>(USER_KEY).await?)
}

/// Binds the identity to a fresh session id.
pub async fn start(handle: &tower_sessions::Session, session: &Session) -> anyhow::Result<()> {
    handle.cycle_id().await?;
    handle.insert(USER_KEY, session).await?;
    Ok(())
}

/// Deletes the server-side record and expires the cookie.
pub async fn end(handle: &tower_sessions::Session) -> anyhow::Result<()> {
    handle.flush().await?;
    Ok(())
}
