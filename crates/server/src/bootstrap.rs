use std::sync::Arc;

use orderdesk_agent::{AssistantRuntime, LlmError, OpenAiClient, RuntimeSettings};
use orderdesk_core::config::{AppConfig, ConfigError, LoadOptions, SessionStoreKind};
use orderdesk_core::session::store::{InMemorySessionStore, SessionStore, StoreError};
use orderdesk_db::{connect_with_settings, migrations, DbPool, SqlSessionStore};
use orderdesk_storefront::{catalog_provider, StorefrontError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    /// Present only when sessions live in SQLite.
    pub db_pool: Option<DbPool>,
    pub runtime: Arc<AssistantRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("session cleanup failed: {0}")]
    SessionCleanup(#[source] StoreError),
    #[error(transparent)]
    Storefront(#[from] StorefrontError),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        session_store = ?config.session.store,
        "starting application bootstrap"
    );

    let (store, db_pool) = session_store(&config).await?;
    let catalog = catalog_provider(&config.catalog)?;
    let llm = Arc::new(OpenAiClient::from_config(&config.llm)?);
    info!(
        event_name = "system.bootstrap.llm_configured",
        model = %config.llm.model,
        endpoint = %llm.endpoint(),
        credential_present = config.llm.api_key.is_some(),
        "chat completion client configured"
    );

    let runtime =
        AssistantRuntime::new(store, catalog, llm, RuntimeSettings::from_config(&config));
    Ok(Application { config, db_pool, runtime: Arc::new(runtime) })
}

async fn session_store(
    config: &AppConfig,
) -> Result<(Arc<dyn SessionStore>, Option<DbPool>), BootstrapError> {
    match config.session.store {
        SessionStoreKind::Memory => Ok((Arc::new(InMemorySessionStore::new()), None)),
        SessionStoreKind::Sqlite => {
            let pool = connect_with_settings(
                &config.database.url,
                config.database.max_connections,
                config.database.timeout_secs,
            )
            .await
            .map_err(BootstrapError::DatabaseConnect)?;
            info!(
                event_name = "system.bootstrap.database_connected",
                "database connection established"
            );

            migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
            info!(
                event_name = "system.bootstrap.migrations_applied",
                "database migrations applied"
            );

            let store = SqlSessionStore::new(pool.clone());
            let purged = store.purge_expired().await.map_err(BootstrapError::SessionCleanup)?;
            info!(
                event_name = "system.bootstrap.sessions_purged",
                purged,
                "expired session entries removed"
            );
            Ok((Arc::new(store), Some(pool)))
        }
    }
}
