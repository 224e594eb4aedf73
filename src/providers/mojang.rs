/// Official session server provider (Mojang)
use super::{
    check_status, join_url, read_json, ProviderError, SignedPayload, SkinSource,
    TextureLocation, TextureProvider, TextureReference,
};
use crate::identity::PlayerIdentifier;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use tracing::debug;

const TEXTURES_PROPERTY: &str = "textures";

#[derive(Debug, Deserialize)]
struct SessionProfile {
    #[serde(default)]
    properties: Vec<ProfileProperty>,
}

#[derive(Debug, Deserialize)]
struct ProfileProperty {
    name: String,
    value: String,
    #[serde(default)]
    signature: Option<String>,
}

/// Decoded `textures` property payload
#[derive(Debug, Deserialize)]
struct TexturesPayload {
    #[serde(default)]
    textures: TextureSet,
}

#[derive(Debug, Default, Deserialize)]
struct TextureSet {
    #[serde(rename = "SKIN")]
    skin: Option<TextureUrl>,
}

#[derive(Debug, Deserialize)]
struct TextureUrl {
    #[serde(default)]
    url: String,
}

/// Looks players up on the session server by undashed UUID
#[derive(Clone)]
pub struct MojangProvider {
    http: reqwest::Client,
    session_url: String,
}

impl MojangProvider {
    pub fn new(http: reqwest::Client, session_url: impl Into<String>) -> Self {
        Self {
            http,
            session_url: session_url.into(),
        }
    }
}

#[async_trait]
impl TextureProvider for MojangProvider {
    fn source(&self) -> SkinSource {
        SkinSource::Mojang
    }

    async fn fetch_texture(
        &self,
        identifier: &PlayerIdentifier,
    ) -> Result<TextureReference, ProviderError> {
        if !identifier.is_uuid() {
            return Err(ProviderError::NotFound(
                "session server lookups require a UUID".to_string(),
            ));
        }

        let url = join_url(
            &self.session_url,
            &format!("session/minecraft/profile/{}", identifier.canonical()),
        );
        debug!(url = %url, "mojang_profile_lookup");

        let response = self
            .http
            .get(&url)
            .query(&[("unsigned", "false")])
            .send()
            .await?;
        let response = check_status(response, "session server")?;
        let profile: SessionProfile = read_json(response, "session profile").await?;

        let property = profile
            .properties
            .into_iter()
            .find(|p| p.name == TEXTURES_PROPERTY)
            .ok_or_else(|| ProviderError::NotFound("profile has no textures property".into()))?;

        let decoded = STANDARD
            .decode(property.value.as_bytes())
            .map_err(|e| ProviderError::Unavailable(format!("textures property is not base64: {}", e)))?;
        let payload: TexturesPayload = serde_json::from_slice(&decoded)
            .map_err(|e| ProviderError::Unavailable(format!("textures property is not JSON: {}", e)))?;

        let skin_url = payload
            .textures
            .skin
            .map(|skin| skin.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ProviderError::NotFound("profile has no skin".into()))?;

        let signed = property.signature.map(|signature| SignedPayload {
            value: property.value,
            signature,
        });

        Ok(TextureReference {
            source: SkinSource::Mojang,
            location: TextureLocation::parse(&skin_url),
            signed,
        })
    }
}
