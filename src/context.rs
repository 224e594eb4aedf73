/// Application context and dependency injection
use crate::{
    cache::CacheLayer,
    catalog::{CatalogError, CatalogStore, CatalogSync, MineSkinClient, SqliteCatalog},
    config::ServerConfig,
    db,
    error::{AppError, AppResult},
    pipeline::SkinPipeline,
    providers::{self, DraslProvider, ElyProvider, MojangProvider, TextureProvider},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub cache: CacheLayer,
    pub catalog: Arc<dyn CatalogStore>,
    pub pipeline: Arc<SkinPipeline>,
    // Present only when Drasl and MineSkin are both configured
    pub catalog_sync: Option<Arc<CatalogSync>>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        let cache = CacheLayer::from_config(&config.cache).await;

        let pool = db::create_pool(&config.catalog.db_location, db::DatabaseOptions::default())
            .await
            .map_err(CatalogError::from)?;
        db::run_migrations(&pool).await.map_err(CatalogError::from)?;
        db::test_connection(&pool).await.map_err(CatalogError::from)?;

        let catalog: Arc<dyn CatalogStore> = Arc::new(SqliteCatalog::new(pool));

        Self::with_backends(config, cache, catalog)
    }

    /// Wire providers and services around already-built storage backends
    pub fn with_backends(
        config: ServerConfig,
        cache: CacheLayer,
        catalog: Arc<dyn CatalogStore>,
    ) -> AppResult<Self> {
        let upstream = &config.upstream;
        let http = providers::build_http_client(upstream)
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let ely = Arc::new(ElyProvider::new(
            http.clone(),
            upstream.ely_auth_url.clone(),
            upstream.ely_skinsystem_url.clone(),
        ));
        let drasl = upstream
            .drasl_url
            .as_ref()
            .map(|url| DraslProvider::new(http.clone(), url.clone(), upstream.drasl_token.clone()));

        let mut enabled: Vec<Arc<dyn TextureProvider>> = vec![
            Arc::new(MojangProvider::new(
                http.clone(),
                upstream.mojang_session_url.clone(),
            )),
            ely.clone(),
        ];
        match &drasl {
            Some(drasl) => enabled.push(Arc::new(drasl.clone())),
            None => tracing::info!("DRASL_URL not set - managed identity endpoint disabled"),
        }

        let catalog_sync = match (&drasl, &upstream.mineskin_token) {
            (Some(drasl), Some(token)) if config.catalog_sync_configured() => {
                Some(Arc::new(CatalogSync::new(
                    drasl.clone(),
                    MineSkinClient::new(http.clone(), upstream.mineskin_url.clone(), token.clone()),
                    catalog.clone(),
                )))
            }
            _ => None,
        };

        let pipeline = Arc::new(SkinPipeline::new(
            http,
            cache.clone(),
            enabled,
            ely,
            catalog.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            cache,
            catalog,
            pipeline,
            catalog_sync,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
