/// Configuration management for SkySkins
use crate::{
    cache::CacheConfig,
    error::{AppError, AppResult},
};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub catalog: CatalogConfig,
}

/// Service-level configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Upstream identity and signing services
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Official session server base URL
    pub mojang_session_url: String,
    /// Ely.by auth server (name history)
    pub ely_auth_url: String,
    /// Ely.by skinsystem (textures)
    pub ely_skinsystem_url: String,
    /// Managed identity directory; the `/d/` endpoint is disabled without it
    pub drasl_url: Option<String>,
    pub drasl_token: String,
    pub mineskin_url: String,
    pub mineskin_token: Option<String>,
    /// Per-request timeout for every outbound call
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            mojang_session_url: "https://sessionserver.mojang.com".to_string(),
            ely_auth_url: "https://authserver.ely.by".to_string(),
            ely_skinsystem_url: "http://skinsystem.ely.by".to_string(),
            drasl_url: None,
            drasl_token: String::new(),
            mineskin_url: "https://api.mineskin.org".to_string(),
            mineskin_token: None,
            timeout_secs: 10,
            user_agent: format!("skyskins/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Signed texture catalog configuration
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub db_location: PathBuf,
    pub sync_enabled: bool,
    pub sync_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| AppError::Config("Invalid port number".to_string()))?;
        let version = env!("CARGO_PKG_VERSION").to_string();

        let defaults = UpstreamConfig::default();
        let mojang_session_url = env::var("MOJANG_SESSION_URL").unwrap_or(defaults.mojang_session_url);
        let ely_auth_url = env::var("ELY_AUTH_URL").unwrap_or(defaults.ely_auth_url);
        let ely_skinsystem_url = env::var("ELY_SKINSYSTEM_URL").unwrap_or(defaults.ely_skinsystem_url);
        let drasl_url = env::var("DRASL_URL").ok().filter(|v| !v.is_empty());
        let drasl_token = env::var("DRASL_TOKEN").unwrap_or_default();
        let mineskin_url = env::var("MINESKIN_URL").unwrap_or(defaults.mineskin_url);
        let mineskin_token = env::var("MINESKIN_TOKEN").ok().filter(|v| !v.is_empty());
        let timeout_secs = env::var("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| AppError::Config("Invalid upstream timeout".to_string()))?;
        let user_agent = env::var("UPSTREAM_USER_AGENT").unwrap_or(defaults.user_agent);

        let db_location = env::var("CATALOG_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/catalog.sqlite"));
        let sync_enabled = env::var("CATALOG_SYNC_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let sync_interval_secs = env::var("CATALOG_SYNC_INTERVAL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            upstream: UpstreamConfig {
                mojang_session_url,
                ely_auth_url,
                ely_skinsystem_url,
                drasl_url,
                drasl_token,
                mineskin_url,
                mineskin_token,
                timeout_secs,
                user_agent,
            },
            cache: CacheConfig::from_env(),
            catalog: CatalogConfig {
                db_location,
                sync_enabled,
                sync_interval_secs,
            },
        })
    }

    /// Whether the scheduled catalog sync has everything it needs
    pub fn catalog_sync_configured(&self) -> bool {
        self.catalog.sync_enabled
            && self.upstream.drasl_url.is_some()
            && self.upstream.mineskin_token.is_some()
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Config("Hostname cannot be empty".to_string()));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(AppError::Config(
                "Upstream timeout must be at least one second".to_string(),
            ));
        }

        if self.upstream.drasl_url.is_some() && self.upstream.drasl_token.is_empty() {
            return Err(AppError::Config(
                "DRASL_TOKEN is required when DRASL_URL is set".to_string(),
            ));
        }

        if self.catalog.sync_interval_secs == 0 {
            return Err(AppError::Config(
                "Catalog sync interval must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".to_string(),
            port: 0,
            version: "test".to_string(),
        },
        upstream: UpstreamConfig::default(),
        cache: CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        },
        catalog: CatalogConfig {
            db_location: PathBuf::from(":memory:"),
            sync_enabled: false,
            sync_interval_secs: 86400,
        },
    }
}
