use std::sync::Arc;

use crate::{
    config::{Config, StoreKind},
    db::{self, MemoryStore, PgStore, Store},
    services::{AuthService, ImageStore},
};

/// HTTP-layer settings that are not owned by a service
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub max_upload_bytes: usize,
    pub cors_origin: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: 5 * 1024 * 1024,
            cors_origin: None,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: Arc<AuthService>,
    pub images: ImageStore,
    pub settings: HttpSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, auth: AuthService, images: ImageStore) -> Self {
        Self {
            store,
            auth: Arc::new(auth),
            images,
            settings: HttpSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: HttpSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the state from configuration, connecting and migrating Postgres
    /// when it is the configured store
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = match config.store {
            StoreKind::Postgres => {
                let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
                db::run_migrations(&pool).await?;
                tracing::info!("Connected to Postgres and applied migrations");
                Arc::new(PgStore::new(pool))
            }
            StoreKind::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let state = Self::new(
            store,
            AuthService::from_config(config),
            ImageStore::new(&config.upload_dir),
        )
        .with_settings(HttpSettings {
            max_upload_bytes: config.max_upload_bytes,
            cors_origin: config.cors_origin.clone(),
        });

        Ok(state)
    }
}
