/// Fallback resolver - tries skin providers in priority order
use crate::{
    error::{AppError, AppResult},
    identity::PlayerIdentifier,
    metrics,
    providers::{ProviderError, TextureProvider, TextureReference},
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, info};

/// Sequential provider fallback
///
/// Providers are tried strictly in the order given. The first success is
/// returned and remaining providers are never invoked. There is no
/// fan-out: upstreams are rate-sensitive and ordered by authority.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResolver;

impl FallbackResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a texture reference from the first provider that has one
    pub async fn resolve(
        &self,
        identifier: &PlayerIdentifier,
        providers: &[Arc<dyn TextureProvider>],
    ) -> AppResult<TextureReference> {
        let mut last_error =
            ProviderError::Unavailable("no providers configured".to_string());

        for provider in providers {
            let source = provider.source();
            let start = Instant::now();
            let result = provider.fetch_texture(identifier).await;
            let elapsed = start.elapsed().as_secs_f64();

            match result {
                Ok(texture) => {
                    metrics::record_provider_request(source.as_str(), "success", elapsed);
                    info!(
                        source = %source,
                        player = %identifier,
                        location = %texture.location,
                        "texture_resolved"
                    );
                    return Ok(texture);
                }
                Err(e) => {
                    metrics::record_provider_request(source.as_str(), e.kind(), elapsed);
                    debug!(source = %source, player = %identifier, error = %e, "provider_fallthrough");
                    last_error = e;
                }
            }
        }

        Err(AppError::AllProvidersFailed {
            attempted: providers.len(),
            last: last_error,
        })
    }
}
