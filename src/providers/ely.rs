/// Alternate auth provider (Ely.by)
///
/// Ely keys skins by username. UUID lookups first resolve the player's
/// current name from the name history endpoint.
use super::{
    check_status, join_url, read_json, ProviderError, SkinSource, TextureLocation,
    TextureProvider, TextureReference,
};
use crate::identity::PlayerIdentifier;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// One entry of the name history array; the last entry is the current name
#[derive(Debug, Deserialize)]
struct NameHistoryEntry {
    name: String,
}

#[derive(Clone)]
pub struct ElyProvider {
    http: reqwest::Client,
    auth_url: String,
    skinsystem_url: String,
}

impl ElyProvider {
    pub fn new(
        http: reqwest::Client,
        auth_url: impl Into<String>,
        skinsystem_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            auth_url: auth_url.into(),
            skinsystem_url: skinsystem_url.into(),
        }
    }

    /// Currently active username for a player
    pub async fn current_username(
        &self,
        identifier: &PlayerIdentifier,
    ) -> Result<String, ProviderError> {
        if !identifier.is_uuid() {
            return Ok(identifier.canonical().to_string());
        }

        let url = join_url(
            &self.auth_url,
            &format!("api/user/profiles/{}/names", identifier.canonical()),
        );
        debug!(url = %url, "ely_name_history_lookup");

        let response = self.http.get(&url).send().await?;
        let response = check_status(response, "ely name history")?;
        let history: Vec<NameHistoryEntry> = read_json(response, "name history").await?;

        history
            .into_iter()
            .last()
            .map(|entry| entry.name)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ProviderError::NotFound("empty name history".to_string()))
    }

    /// Texture URL for a username, derived from the skinsystem template
    pub fn skin_url(&self, username: &str) -> String {
        join_url(
            &self.skinsystem_url,
            &format!("skins/{}.png", urlencoding::encode(username)),
        )
    }

    /// Raw signed textures document for a username, returned verbatim
    pub async fn signed_textures(&self, username: &str) -> Result<Vec<u8>, ProviderError> {
        let url = join_url(
            &self.skinsystem_url,
            &format!("textures/signed/{}", urlencoding::encode(username)),
        );
        debug!(url = %url, "ely_signed_textures_lookup");

        let response = self.http.get(&url).send().await?;
        let response = check_status(response, "ely skinsystem")?;
        let body = response.bytes().await?;

        Ok(body.to_vec())
    }
}

#[async_trait]
impl TextureProvider for ElyProvider {
    fn source(&self) -> SkinSource {
        SkinSource::Ely
    }

    async fn fetch_texture(
        &self,
        identifier: &PlayerIdentifier,
    ) -> Result<TextureReference, ProviderError> {
        let username = self.current_username(identifier).await?;

        Ok(TextureReference {
            source: SkinSource::Ely,
            location: TextureLocation::Url(self.skin_url(&username)),
            signed: None,
        })
    }
}
