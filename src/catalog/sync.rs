/// Catalog sync - signs managed roster skins through MineSkin
///
/// For every Drasl player whose skin URL changed since the last run, the
/// skin is submitted to MineSkin and the returned signed `textures`
/// property is stored in the catalog.
use super::{
    CatalogError, CatalogStore, SignedTextureRecord, TextureProperty, MANAGED_MARKER_PROPERTY,
    TEXTURES_PROPERTY,
};
use crate::{
    identity::PlayerIdentifier,
    providers::{drasl::DraslPlayer, DraslProvider, ProviderError, SignedPayload},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to list roster: {0}")]
    Roster(#[from] ProviderError),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Outcome counters of one sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub checked: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    variant: &'a str,
    name: &'a str,
    visibility: &'a str,
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    skin: GeneratedSkin,
}

#[derive(Debug, Deserialize)]
struct GeneratedSkin {
    texture: GeneratedTexture,
}

#[derive(Debug, Deserialize)]
struct GeneratedTexture {
    data: SignedPayload,
}

/// Texture signing service client
#[derive(Clone)]
pub struct MineSkinClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl MineSkinClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Submit a skin URL and return the signed textures property
    pub async fn generate(&self, player: &DraslPlayer, skin_url: &str) -> Result<SignedPayload, SyncError> {
        let url = format!("{}/v2/generate", self.base_url.trim_end_matches('/'));
        let variant = player
            .skin_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("classic");

        info!(player = %player.name, "Uploading skin for signing");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&GenerateRequest {
                variant,
                name: &player.name,
                visibility: "public",
                url: skin_url,
            })
            .send()
            .await
            .map_err(|e| SyncError::Signing(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Signing(e.to_string()))?;
        debug!(player = %player.name, status = %status, body = %body, "mineskin_response");

        if !status.is_success() {
            return Err(SyncError::Signing(format!("mineskin returned {}", status)));
        }

        let generated: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| SyncError::Signing(format!("invalid mineskin response: {}", e)))?;
        let payload = generated.skin.texture.data;

        if payload.value.is_empty() || payload.signature.is_empty() {
            return Err(SyncError::Signing("mineskin returned an empty signature".into()));
        }

        Ok(payload)
    }
}

/// Reconciles the Drasl roster with the catalog
pub struct CatalogSync {
    drasl: DraslProvider,
    mineskin: MineSkinClient,
    catalog: Arc<dyn CatalogStore>,
    running: Mutex<()>,
}

impl CatalogSync {
    pub fn new(drasl: DraslProvider, mineskin: MineSkinClient, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            drasl,
            mineskin,
            catalog,
            running: Mutex::new(()),
        }
    }

    /// Run once unless a previous run is still in progress.
    ///
    /// Returns `None` when the run was skipped.
    pub async fn run_guarded(&self) -> Option<Result<SyncSummary, SyncError>> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Catalog sync still running, skipping this tick");
            return None;
        };

        Some(self.run_once().await)
    }

    /// Walk the roster once. Per-player failures are logged and counted.
    pub async fn run_once(&self) -> Result<SyncSummary, SyncError> {
        let players = self.drasl.list_players().await?;
        let mut summary = SyncSummary::default();

        for player in players {
            summary.checked += 1;
            debug!(player = %player.name, "Checking player");

            match self.sync_player(&player).await {
                Ok(true) => summary.updated += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    warn!(player = %player.name, error = %e, "Failed to sync player");
                    summary.failed += 1;
                }
            }
        }

        info!(
            checked = summary.checked,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            "Catalog sync finished"
        );

        Ok(summary)
    }

    /// Returns whether the catalog was written
    async fn sync_player(&self, player: &DraslPlayer) -> Result<bool, SyncError> {
        let Some(skin_url) = player.skin_url.as_deref().filter(|url| !url.is_empty()) else {
            debug!(player = %player.name, "Skipping - no skin");
            return Ok(false);
        };

        let id = PlayerIdentifier::uuid(&player.uuid)
            .map_err(|e| SyncError::Signing(e.to_string()))?;

        if let Some(existing) = self.catalog.find(id.canonical()).await? {
            if existing.url == skin_url {
                debug!(player = %player.name, "Skipping - URL unchanged");
                return Ok(false);
            }
        }

        let signed = self.mineskin.generate(player, skin_url).await?;

        let record = SignedTextureRecord {
            id: id.canonical().to_string(),
            name: player.name.clone(),
            url: skin_url.to_string(),
            properties: vec![
                TextureProperty {
                    name: TEXTURES_PROPERTY.to_string(),
                    value: signed.value,
                    signature: Some(signed.signature),
                },
                TextureProperty {
                    name: MANAGED_MARKER_PROPERTY.to_string(),
                    value: "managed".to_string(),
                    signature: None,
                },
            ],
            updated_at: Utc::now(),
        };

        self.catalog.upsert(&record).await?;
        info!(player = %player.name, "Stored signed textures");

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::SqliteCatalog, db};
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn roster() -> serde_json::Value {
        serde_json::json!([
            {
                "uuid": "069a79f4-44e9-4726-a5be-fca90e38aaf5",
                "name": "Steve",
                "skinUrl": "https://drasl.test/steve.png",
                "skinModel": "classic"
            },
            {
                "uuid": "853c80ef-3c37-49fd-aa49-938b674adae6",
                "name": "Alex",
                "skinUrl": "https://drasl.test/alex.png",
                "skinModel": "slim"
            },
            {
                "uuid": "11111111-2222-3333-4444-555555555555",
                "name": "Bare",
                "skinUrl": ""
            }
        ])
    }

    async fn setup() -> (MockServer, Arc<SqliteCatalog>, CatalogSync) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drasl/api/v2/players"))
            .and(header("Authorization", "Bearer drasl-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(roster()))
            .mount(&server)
            .await;

        let catalog = Arc::new(SqliteCatalog::new(db::create_memory_pool().await.unwrap()));
        let http = reqwest::Client::new();
        let sync = CatalogSync::new(
            DraslProvider::new(http.clone(), server.uri(), "drasl-token"),
            MineSkinClient::new(http, server.uri(), "mineskin-token"),
            catalog.clone(),
        );

        (server, catalog, sync)
    }

    fn signed_response(value: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "skin": { "texture": { "data": { "value": value, "signature": "sig" } } }
        }))
    }

    #[tokio::test]
    async fn test_signs_changed_players() {
        let (server, catalog, sync) = setup().await;
        Mock::given(method("POST"))
            .and(path("/v2/generate"))
            .and(header("Authorization", "Bearer mineskin-token"))
            .and(body_partial_json(serde_json::json!({ "visibility": "public" })))
            .respond_with(signed_response("signed-value"))
            .expect(2)
            .mount(&server)
            .await;

        let summary = sync.run_once().await.unwrap();
        assert_eq!(
            summary,
            SyncSummary { checked: 3, updated: 2, skipped: 1, failed: 0 }
        );

        let steve = catalog
            .find("069a79f444e94726a5befca90e38aaf5")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(steve.url, "https://drasl.test/steve.png");
        assert_eq!(steve.properties[0].name, TEXTURES_PROPERTY);
        assert_eq!(steve.properties[0].value, "signed-value");
        assert_eq!(steve.properties[0].signature.as_deref(), Some("sig"));
    }

    #[tokio::test]
    async fn test_unchanged_url_is_skipped() {
        let (server, catalog, sync) = setup().await;
        Mock::given(method("POST"))
            .and(path("/v2/generate"))
            .and(body_partial_json(serde_json::json!({ "name": "Alex", "variant": "slim" })))
            .respond_with(signed_response("alex-value"))
            .expect(1)
            .mount(&server)
            .await;

        catalog
            .upsert(&SignedTextureRecord {
                id: "069a79f444e94726a5befca90e38aaf5".into(),
                name: "Steve".into(),
                url: "https://drasl.test/steve.png".into(),
                properties: vec![],
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let summary = sync.run_once().await.unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped, 2);
    }

    #[tokio::test]
    async fn test_signing_failure_does_not_abort_run() {
        let (server, _catalog, sync) = setup().await;
        Mock::given(method("POST"))
            .and(path("/v2/generate"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let summary = sync.run_once().await.unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.checked, 3);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_skipped() {
        let (_server, _catalog, sync) = setup().await;

        let _held = sync.running.lock().await;
        assert!(sync.run_guarded().await.is_none());
    }
}
