/// Managed identity provider (Drasl)
///
/// Authenticated with a bearer token against the Drasl admin API. Players
/// are addressed by dashed UUID.
use super::{
    check_status, join_url, read_json, ProviderError, SkinSource, TextureLocation,
    TextureProvider, TextureReference,
};
use crate::identity::PlayerIdentifier;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Player record as returned by the Drasl v2 API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraslPlayer {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub skin_url: Option<String>,
    #[serde(default)]
    pub skin_model: Option<String>,
    #[serde(default)]
    pub cape_url: Option<String>,
}

#[derive(Clone)]
pub struct DraslProvider {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl DraslProvider {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Fetch a single player profile by dashed UUID
    pub async fn player(&self, identifier: &PlayerIdentifier) -> Result<DraslPlayer, ProviderError> {
        let dashed = identifier.dashed().ok_or_else(|| {
            ProviderError::NotFound("player lookups require a UUID".to_string())
        })?;

        let url = join_url(&self.base_url, &format!("drasl/api/v2/players/{}", dashed));
        debug!(url = %url, "drasl_player_lookup");

        let response = self.http.get(&url).bearer_auth(&self.token).send().await?;
        let response = check_status(response, "drasl")?;
        read_json(response, "drasl player").await
    }

    /// List every player in the managed roster
    pub async fn list_players(&self) -> Result<Vec<DraslPlayer>, ProviderError> {
        let url = join_url(&self.base_url, "drasl/api/v2/players");
        debug!(url = %url, "drasl_player_list");

        let response = self.http.get(&url).bearer_auth(&self.token).send().await?;
        let response = check_status(response, "drasl")?;
        read_json(response, "drasl player list").await
    }
}

#[async_trait]
impl TextureProvider for DraslProvider {
    fn source(&self) -> SkinSource {
        SkinSource::Drasl
    }

    async fn fetch_texture(
        &self,
        identifier: &PlayerIdentifier,
    ) -> Result<TextureReference, ProviderError> {
        let player = self.player(identifier).await?;

        let skin_url = player
            .skin_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ProviderError::NotFound(format!("{} has no skin", player.name)))?;

        Ok(TextureReference {
            source: SkinSource::Drasl,
            location: TextureLocation::parse(&skin_url),
            signed: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    const DASHED: &str = "069a79f4-44e9-4726-a5be-fca90e38aaf5";

    fn player_json(skin_url: &str) -> serde_json::Value {
        serde_json::json!({
            "uuid": DASHED,
            "name": "Steve",
            "skinUrl": skin_url,
            "skinModel": "classic",
            "capeUrl": "",
            "userUuid": "7c2f3e44-0000-0000-0000-000000000000",
            "offlineUuid": "00000000-0000-0000-0000-000000000000",
            "createdAt": "2024-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_authenticated_lookup_by_dashed_uuid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/drasl/api/v2/players/{}", DASHED)))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(player_json("https://drasl.test/web/texture/skin/abc.png")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = DraslProvider::new(reqwest::Client::new(), server.uri(), "secret");
        let id = PlayerIdentifier::uuid("069a79f444e94726a5befca90e38aaf5").unwrap();
        let texture = provider.fetch_texture(&id).await.unwrap();

        assert_eq!(texture.source, SkinSource::Drasl);
        assert_eq!(
            texture.location,
            TextureLocation::Url("https://drasl.test/web/texture/skin/abc.png".into())
        );
    }

    #[tokio::test]
    async fn test_missing_player_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({ "message": "Unknown UUID" })),
            )
            .mount(&server)
            .await;

        let provider = DraslProvider::new(reqwest::Client::new(), server.uri(), "secret");
        let id = PlayerIdentifier::uuid(DASHED).unwrap();
        let err = provider.fetch_texture(&id).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unauthorized_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = DraslProvider::new(reqwest::Client::new(), server.uri(), "wrong");
        let id = PlayerIdentifier::uuid(DASHED).unwrap();
        let err = provider.fetch_texture(&id).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_skin_url_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(player_json("")))
            .mount(&server)
            .await;

        let provider = DraslProvider::new(reqwest::Client::new(), server.uri(), "secret");
        let id = PlayerIdentifier::uuid(DASHED).unwrap();
        let err = provider.fetch_texture(&id).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_players() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drasl/api/v2/players"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                player_json("https://drasl.test/a.png")
            ])))
            .mount(&server)
            .await;

        let provider = DraslProvider::new(reqwest::Client::new(), server.uri(), "secret");
        let players = provider.list_players().await.unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Steve");
        assert_eq!(players[0].skin_model.as_deref(), Some("classic"));
    }
}
