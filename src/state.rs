use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower_sessions::MemoryStore;
use tracing::{info, warn};

use crate::{
    auth::{memory::MemoryUserStore, repo::PgUserStore, repo::UserStore},
    chat::{ChatClient, OpenAiChatClient},
    config::{AppConfig, AuthMode, ChatConfig, DemoConfig, SessionConfig, StoreKind, WebhookConfig},
    error::ApiError,
    guides::GuideLibrary,
    payments::webhook::{StripeVerifier, WebhookVerifier},
    showcase::Showcase,
};

/// The users table is the store; a deployment without it must not start.
async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")
}

/// The login path of a deployment. Demo mode carries no store at all, so
/// the fixed credential pair can never sit alongside real accounts.
#[derive(Clone)]
pub enum AuthBackend {
    Store(Arc<dyn UserStore>),
    Demo(DemoConfig),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthBackend,
    pub showcase: Arc<Showcase>,
    pub guides: GuideLibrary,
    pub chat: Option<Arc<dyn ChatClient>>,
    pub webhook: Option<Arc<dyn WebhookVerifier>>,
    pub sessions: MemoryStore,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let auth = match (config.auth_mode, config.store) {
            (AuthMode::Demo, _) => {
                warn!(username = %config.demo.username, "AUTH_MODE=demo: fixed credentials, no user store");
                AuthBackend::Demo(config.demo.clone())
            }
            (AuthMode::Store, StoreKind::Memory) => {
                warn!("USER_STORE=memory: accounts are lost on restart");
                AuthBackend::Store(Arc::new(MemoryUserStore::new()))
            }
            (AuthMode::Store, StoreKind::Postgres) => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                migrate(&db).await?;
                info!("user store: postgres");
                AuthBackend::Store(Arc::new(PgUserStore::new(db)))
            }
        };

        let showcase = Arc::new(Showcase::load(config.showcase_path.as_deref())?);
        let guides = GuideLibrary::new(config.guides_dir.clone());
        let chat = OpenAiChatClient::from_config(&config.chat)
            .map(|c| Arc::new(c) as Arc<dyn ChatClient>);
        if chat.is_none() {
            warn!("CHAT_API_KEY not set; /api/chat will answer 503");
        }
        let webhook = config.webhook.secret.as_ref().map(|secret| {
            Arc::new(StripeVerifier::new(secret.clone(), config.webhook.tolerance_secs))
                as Arc<dyn WebhookVerifier>
        });
        if webhook.is_none() {
            warn!("WEBHOOK_SECRET not set; payment webhooks will be rejected");
        }

        Ok(Self {
            config,
            auth,
            showcase,
            guides,
            chat,
            webhook,
            sessions: MemoryStore::default(),
        })
    }

    /// The user store, or 503 when the deployment runs in demo mode.
    pub fn users(&self) -> Result<&Arc<dyn UserStore>, ApiError> {
        match &self.auth {
            AuthBackend::Store(store) => Ok(store),
            AuthBackend::Demo(_) => Err(ApiError::Unavailable(
                "accounts are disabled in demo mode".into(),
            )),
        }
    }

    /// In-memory state with fixed secrets, no chat backend and no guides
    /// directory. Used by tests and local experiments.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            auth_mode: AuthMode::Store,
            store: StoreKind::Memory,
            database_url: None,
            session: SessionConfig {
                ttl_minutes: 5,
                cookie_secure: false,
            },
            admin_code: Some("test-admin-code".into()),
            demo: DemoConfig {
                username: "rizzo".into(),
                password: "farout".into(),
            },
            webhook: WebhookConfig {
                secret: Some("whsec_test".into()),
                tolerance_secs: 300,
            },
            guides_dir: std::env::temp_dir().join("backoffice-guides-missing"),
            showcase_path: None,
            chat: ChatConfig {
                api_url: "http://localhost:0/v1/chat/completions".into(),
                api_key: None,
                model: "test".into(),
            },
        });

        let webhook = Arc::new(StripeVerifier::new("whsec_test", 300)) as Arc<dyn WebhookVerifier>;
        Self {
            auth: AuthBackend::Store(Arc::new(MemoryUserStore::new())),
            showcase: Arc::new(Showcase::default()),
            guides: GuideLibrary::new(config.guides_dir.clone()),
            chat: None,
            webhook: Some(webhook),
            sessions: MemoryStore::default(),
            config,
        }
    }

    /// Same as [`AppState::fake`] but with the fixed demo credentials instead of a store.
    pub fn fake_demo() -> Self {
        let mut state = Self::fake();
        let mut config = (*state.config).clone();
        config.auth_mode = AuthMode::Demo;
        state.auth = AuthBackend::Demo(config.demo.clone());
        state.config = Arc::new(config);
        state
    }
}
