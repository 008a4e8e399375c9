use std::path::PathBuf;

use serde::Deserialize;

/// One year.
pub const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Idle lifetime of a session; any request carrying the cookie extends it.
    pub ttl_minutes: i64,
    pub cookie_secure: bool,
}

/// Which login path a deployment runs. Only one is ever active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Store,
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub secret: Option<String>,
    pub tolerance_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub auth_mode: AuthMode,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub session: SessionConfig,
    pub admin_code: Option<String>,
    pub demo: DemoConfig,
    pub webhook: WebhookConfig,
    pub guides_dir: PathBuf,
    pub showcase_path: Option<PathBuf>,
    pub chat: ChatConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let auth_mode = match optional("AUTH_MODE").as_deref() {
            None | Some("store") => AuthMode::Store,
            Some("demo") => AuthMode::Demo,
            Some(other) => anyhow::bail!("unknown AUTH_MODE {other:?} (expected store or demo)"),
        };
        let store = match optional("USER_STORE").as_deref() {
            None | Some("postgres") => StoreKind::Postgres,
            Some("memory") => StoreKind::Memory,
            Some(other) => anyhow::bail!("unknown USER_STORE {other:?} (expected postgres or memory)"),
        };

        let database_url = optional("DATABASE_URL");
        if auth_mode == AuthMode::Store && store == StoreKind::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when USER_STORE=postgres");
        }

        let session = SessionConfig {
            ttl_minutes: session_ttl(parsed("SESSION_TTL_MINUTES").unwrap_or(60 * 12))?,
            cookie_secure: parsed("COOKIE_SECURE").unwrap_or(false),
        };

        let demo = DemoConfig {
            username: std::env::var("DEMO_USERNAME").unwrap_or_else(|_| "rizzo".into()),
            password: std::env::var("DEMO_PASSWORD").unwrap_or_else(|_| "farout".into()),
        };

        let webhook = WebhookConfig {
            secret: optional("WEBHOOK_SECRET"),
            tolerance_secs: parsed("WEBHOOK_TOLERANCE_SECS").unwrap_or(300),
        };

        let chat = ChatConfig {
            api_url: std::env::var("CHAT_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".into()),
            api_key: optional("CHAT_API_KEY"),
            model: std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
        };

        Ok(Self {
            auth_mode,
            store,
            database_url,
            session,
            admin_code: optional("ADMIN_CODE"),
            demo,
            webhook,
            guides_dir: optional("GUIDES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./guides")),
            showcase_path: optional("SHOWCASE_PATH").map(PathBuf::from),
            chat,
        })
    }
}

/// Unset and empty variables are treated the same.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

fn session_ttl(minutes: i64) -> anyhow::Result<i64> {
    if !(1..=MAX_SESSION_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!("SESSION_TTL_MINUTES must be between 1 and {MAX_SESSION_TTL_MINUTES}, got {minutes}");
    }
    Ok(minutes)
}
