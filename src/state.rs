use crate::config::AppConfig;
use crate::mail::{LogMailer, Mailer};
use crate::storage::{S3Storage, StorageClient};
use crate::store::{PgStore, Store};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

/// Everything a handler needs, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let storage = S3Storage::connect(&config.storage).await?;
        if let Err(e) = storage.ensure_bucket().await {
            tracing::warn!(error = ?e, "picture bucket unavailable; uploads will fail");
        }

        Ok(Self::from_parts(
            Arc::new(PgStore::new(db)),
            config,
            Arc::new(storage),
            Arc::new(LogMailer),
        ))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            config,
            storage,
            mailer,
        }
    }
}
