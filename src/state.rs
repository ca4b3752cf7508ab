//! Shared application state

use sqlx::PgPool;

use crate::config::Config;
use crate::crypto::MasterKey;
use crate::oauth::StateStore;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Token encryption key
    pub master_key: MasterKey,
    /// In-flight OAuth handshake states
    pub oauth_states: StateStore,
    /// Service configuration
    pub config: Config,
}

impl AppState {
    /// Connect to the database, run migrations, and build the state
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        if config.webhook_signature_key.is_none() {
            tracing::warn!(
                "WEBHOOK_SIGNATURE_KEY not configured — webhook signature \
                 verification is DISABLED. Never run production like this."
            );
        }

        Ok(Self::build(config, pool))
    }

    /// Build state around an existing pool (no connect, no migrations)
    pub fn build(config: Config, pool: PgPool) -> Self {
        let master_key = MasterKey::from_secret(&config.token_encryption_secret);
        Self {
            pool,
            master_key,
            oauth_states: StateStore::new(),
            config,
        }
    }
}
