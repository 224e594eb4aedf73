/// Avatar pipeline
///
/// request -> cache lookup -> provider fallback -> texture download ->
/// render -> cache write. The cache write is the final await of every
/// operation, so a request dropped mid-flight never stores anything.
use crate::{
    cache::{CacheKey, CacheLayer},
    catalog::CatalogStore,
    error::{AppError, AppResult},
    identity::{FallbackResolver, PlayerIdentifier},
    metrics,
    providers::{ElyProvider, SkinSource, TextureLocation, TextureProvider},
    render,
};
use std::{collections::BTreeMap, sync::Arc, time::Instant};
use tracing::{debug, info, warn};

/// Shared avatar and texture-data service
pub struct SkinPipeline {
    http: reqwest::Client,
    cache: CacheLayer,
    resolver: FallbackResolver,
    providers: BTreeMap<SkinSource, Arc<dyn TextureProvider>>,
    ely: Arc<ElyProvider>,
    catalog: Arc<dyn CatalogStore>,
}

impl SkinPipeline {
    pub fn new(
        http: reqwest::Client,
        cache: CacheLayer,
        providers: Vec<Arc<dyn TextureProvider>>,
        ely: Arc<ElyProvider>,
        catalog: Arc<dyn CatalogStore>,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.source(), provider))
            .collect();

        Self {
            http,
            cache,
            resolver: FallbackResolver::new(),
            providers,
            ely,
            catalog,
        }
    }

    /// Sources with a configured provider, in priority order
    pub fn enabled_sources(&self) -> Vec<SkinSource> {
        self.providers.keys().copied().collect()
    }

    /// Rendered avatar from a single provider
    pub async fn avatar(&self, source: SkinSource, player: &PlayerIdentifier) -> AppResult<Vec<u8>> {
        let provider = self
            .providers
            .get(&source)
            .cloned()
            .ok_or(AppError::ProviderDisabled(source))?;

        self.cache
            .get_or_compute(&CacheKey::avatar(source, player), || async move {
                let texture = self.resolver.resolve(player, &[provider]).await?;
                let skin = self.download_texture(&texture.location).await?;
                self.render(skin).await
            })
            .await
    }

    /// Rendered avatar from the first provider that has one.
    ///
    /// When `username` is given, the Ely step looks the player up by name
    /// instead of by UUID.
    pub async fn aggregate_avatar(
        &self,
        player: &PlayerIdentifier,
        username: Option<&PlayerIdentifier>,
    ) -> AppResult<Vec<u8>> {
        let key = CacheKey::aggregate_avatar(player, username);

        self.cache
            .get_or_compute(&key, || async move {
                let mut failures = Vec::new();

                for source in self.enabled_sources() {
                    let target = match (source, username) {
                        (SkinSource::Ely, Some(name)) => name,
                        _ => player,
                    };

                    match self.avatar(source, target).await {
                        Ok(bytes) => {
                            info!(source = %source, player = %player, "aggregate_avatar_served");
                            return Ok(bytes);
                        }
                        Err(e) => {
                            debug!(source = %source, player = %player, error = %e, "aggregate_step_failed");
                            failures.push(format!("{}: {}", source, e));
                        }
                    }
                }

                if failures.is_empty() {
                    failures.push("no providers configured".to_string());
                }
                Err(AppError::Gateway(failures.join("; ")))
            })
            .await
    }

    /// Raw signed-texture document for a player.
    ///
    /// Catalog records take precedence; otherwise the Ely skinsystem
    /// document is returned verbatim.
    pub async fn texture_data(&self, player: &PlayerIdentifier) -> AppResult<Vec<u8>> {
        self.cache
            .get_or_compute(&CacheKey::texture_data(player), || async move {
                match self.catalog.find(player.canonical()).await {
                    Ok(Some(record)) => {
                        debug!(player = %player, "texture_data_from_catalog");
                        return serde_json::to_vec(&record)
                            .map_err(|e| AppError::Internal(format!("catalog record: {}", e)));
                    }
                    Ok(None) => {}
                    Err(e) => warn!(player = %player, error = %e, "catalog lookup failed"),
                }

                let fetched = async {
                    let username = self.ely.current_username(player).await?;
                    self.ely.signed_textures(&username).await
                }
                .await;

                fetched.map_err(|last| AppError::AllProvidersFailed { attempted: 1, last })
            })
            .await
    }

    async fn download_texture(&self, location: &TextureLocation) -> AppResult<Vec<u8>> {
        debug!(location = %location, "texture_download");

        match location {
            TextureLocation::Url(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| AppError::TextureUnavailable(format!("{}: {}", url, e)))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(AppError::TextureUnavailable(format!(
                        "{} returned {}",
                        url, status
                    )));
                }

                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| AppError::TextureUnavailable(format!("{}: {}", url, e)))?;
                Ok(bytes.to_vec())
            }
            TextureLocation::LocalPath(path) => tokio::fs::read(path)
                .await
                .map_err(|e| AppError::TextureUnavailable(format!("{}: {}", path.display(), e))),
        }
    }

    /// Decoding and scaling run off the async workers
    async fn render(&self, skin: Vec<u8>) -> AppResult<Vec<u8>> {
        let start = Instant::now();
        let avatar = tokio::task::spawn_blocking(move || render::render_face(&skin, true))
            .await
            .map_err(|e| AppError::Internal(format!("render task failed: {}", e)))??;
        metrics::record_render(start.elapsed().as_secs_f64());

        Ok(avatar.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::MemoryCache,
        catalog::{CatalogError, SignedTextureRecord, TextureProperty},
        providers::{ProviderError, TextureReference},
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::{
        io::Cursor,
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    /// Provider that always points at one local texture file
    struct LocalProvider {
        source: SkinSource,
        path: Option<PathBuf>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextureProvider for LocalProvider {
        fn source(&self) -> SkinSource {
            self.source
        }

        async fn fetch_texture(
            &self,
            _identifier: &PlayerIdentifier,
        ) -> Result<TextureReference, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.path {
                Some(path) => Ok(TextureReference {
                    source: self.source,
                    location: TextureLocation::LocalPath(path.clone()),
                    signed: None,
                }),
                None => Err(ProviderError::NotFound("no such player".into())),
            }
        }
    }

    struct FixedCatalog(Option<SignedTextureRecord>);

    #[async_trait]
    impl CatalogStore for FixedCatalog {
        async fn find(&self, _id: &str) -> Result<Option<SignedTextureRecord>, CatalogError> {
            Ok(self.0.clone())
        }

        async fn upsert(&self, _record: &SignedTextureRecord) -> Result<(), CatalogError> {
            Ok(())
        }

        async fn ping(&self) -> Result<(), CatalogError> {
            Ok(())
        }
    }

    fn skin_png() -> Vec<u8> {
        let image = RgbaImage::from_pixel(64, 64, Rgba([200, 40, 40, 255]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    /// Catalog whose backing database is unreachable
    struct FailingCatalog;

    #[async_trait]
    impl CatalogStore for FailingCatalog {
        async fn find(&self, _id: &str) -> Result<Option<SignedTextureRecord>, CatalogError> {
            Err(CatalogError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn upsert(&self, _record: &SignedTextureRecord) -> Result<(), CatalogError> {
            Err(CatalogError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn ping(&self) -> Result<(), CatalogError> {
            Err(CatalogError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    fn pipeline_with(
        providers: Vec<Arc<dyn TextureProvider>>,
        catalog: Arc<dyn CatalogStore>,
        ely_url: &str,
    ) -> SkinPipeline {
        let http = reqwest::Client::new();
        SkinPipeline::new(
            http.clone(),
            CacheLayer::new(Arc::new(MemoryCache::default()), "skin:"),
            providers,
            Arc::new(ElyProvider::new(http, ely_url, ely_url)),
            catalog,
        )
    }

    fn pipeline(
        providers: Vec<Arc<dyn TextureProvider>>,
        catalog: Option<SignedTextureRecord>,
    ) -> SkinPipeline {
        pipeline_with(providers, Arc::new(FixedCatalog(catalog)), "http://127.0.0.1:9")
    }

    fn steve() -> PlayerIdentifier {
        PlayerIdentifier::uuid("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap()
    }

    #[tokio::test]
    async fn test_avatar_is_cached_after_first_render() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skin.png");
        std::fs::write(&path, skin_png()).unwrap();

        let provider = Arc::new(LocalProvider {
            source: SkinSource::Mojang,
            path: Some(path),
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline(vec![provider.clone()], None);

        let first = pipeline.avatar(SkinSource::Mojang, &steve()).await.unwrap();
        let second = pipeline.avatar(SkinSource::Mojang, &steve()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let decoded = image::load_from_memory(&first).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (96, 96));
    }

    #[tokio::test]
    async fn test_unconfigured_source_is_disabled() {
        let pipeline = pipeline(vec![], None);
        let err = pipeline.avatar(SkinSource::Drasl, &steve()).await.unwrap_err();
        assert!(matches!(err, AppError::ProviderDisabled(SkinSource::Drasl)));
    }

    #[tokio::test]
    async fn test_missing_local_texture_is_unavailable() {
        let provider = Arc::new(LocalProvider {
            source: SkinSource::Drasl,
            path: Some(PathBuf::from("/nonexistent/skin.png")),
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline(vec![provider], None);

        let err = pipeline.avatar(SkinSource::Drasl, &steve()).await.unwrap_err();
        assert!(matches!(err, AppError::TextureUnavailable(_)));
    }

    #[tokio::test]
    async fn test_aggregate_falls_through_in_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skin.png");
        std::fs::write(&path, skin_png()).unwrap();

        let drasl = Arc::new(LocalProvider {
            source: SkinSource::Drasl,
            path: None,
            calls: AtomicUsize::new(0),
        });
        let mojang = Arc::new(LocalProvider {
            source: SkinSource::Mojang,
            path: Some(path),
            calls: AtomicUsize::new(0),
        });
        let ely = Arc::new(LocalProvider {
            source: SkinSource::Ely,
            path: None,
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline(vec![ely.clone(), mojang.clone(), drasl.clone()], None);

        pipeline.aggregate_avatar(&steve(), None).await.unwrap();
        pipeline.aggregate_avatar(&steve(), None).await.unwrap();

        assert_eq!(drasl.calls.load(Ordering::SeqCst), 1);
        assert_eq!(mojang.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ely.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_aggregate_all_fail_is_gateway_error() {
        let providers: Vec<Arc<dyn TextureProvider>> = SkinSource::ALL
            .iter()
            .map(|source| {
                Arc::new(LocalProvider {
                    source: *source,
                    path: None,
                    calls: AtomicUsize::new(0),
                }) as Arc<dyn TextureProvider>
            })
            .collect();
        let pipeline = pipeline(providers, None);

        let err = pipeline.aggregate_avatar(&steve(), None).await.unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));
    }

    #[tokio::test]
    async fn test_texture_data_prefers_catalog() {
        let record = SignedTextureRecord {
            id: "069a79f444e94726a5befca90e38aaf5".into(),
            name: "Steve".into(),
            url: "https://drasl.test/steve.png".into(),
            properties: vec![TextureProperty {
                name: "textures".into(),
                value: "dmFsdWU=".into(),
                signature: Some("c2ln".into()),
            }],
            updated_at: Utc::now(),
        };
        let pipeline = pipeline(vec![], Some(record));

        let body = pipeline.texture_data(&steve()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["name"], "Steve");
        assert_eq!(json["properties"][0]["value"], "dmFsdWU=");
    }

    #[tokio::test]
    async fn test_texture_data_falls_through_to_ely_when_catalog_fails() {
        let ely = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/profiles/069a79f444e94726a5befca90e38aaf5/names"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "name": "OldName" },
                { "name": "Steve" }
            ])))
            .expect(1)
            .mount(&ely)
            .await;

        // Spacing and key order must survive untouched
        let document = br#"{"id":"069a79f444e94726a5befca90e38aaf5", "name":"Steve","properties":[]}"#;
        Mock::given(method("GET"))
            .and(path("/textures/signed/Steve"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(document.to_vec()))
            .expect(1)
            .mount(&ely)
            .await;

        let pipeline = pipeline_with(vec![], Arc::new(FailingCatalog), &ely.uri());

        let body = pipeline.texture_data(&steve()).await.unwrap();
        assert_eq!(body, document.to_vec());
    }
}
