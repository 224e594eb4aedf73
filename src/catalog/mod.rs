/// Signed texture catalog
///
/// Persists MineSkin-signed texture properties for players of the managed
/// (Drasl) roster so game clients can be served a valid signature.

pub mod sqlite;
pub mod sync;

pub use sqlite::SqliteCatalog;
pub use sync::{CatalogSync, MineSkinClient, SyncError, SyncSummary};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Property name game clients look up
pub const TEXTURES_PROPERTY: &str = "textures";

/// Marker property identifying records issued for the managed roster
pub const MANAGED_MARKER_PROPERTY: &str = "drasl";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt catalog record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One profile property, as game clients expect it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureProperty {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Catalog entry for one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTextureRecord {
    /// Undashed lowercase UUID
    pub id: String,
    pub name: String,
    /// Skin URL the signature was issued for
    pub url: String,
    pub properties: Vec<TextureProperty>,
    #[serde(skip)]
    pub updated_at: DateTime<Utc>,
}

/// Persistence for signed texture records
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look a record up by undashed UUID
    async fn find(&self, id: &str) -> Result<Option<SignedTextureRecord>, CatalogError>;

    /// Insert or replace a record
    async fn upsert(&self, record: &SignedTextureRecord) -> Result<(), CatalogError>;

    /// Check store connectivity
    async fn ping(&self) -> Result<(), CatalogError>;
}
