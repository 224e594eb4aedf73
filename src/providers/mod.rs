/// Skin provider strategies
///
/// Each upstream identity service is wrapped in a [`TextureProvider`] that
/// turns a normalized player identifier into a [`TextureReference`].
/// Providers hold only immutable configuration and a shared HTTP client.

pub mod drasl;
pub mod ely;
pub mod mojang;

pub use drasl::DraslProvider;
pub use ely::ElyProvider;
pub use mojang::MojangProvider;

use crate::{config::UpstreamConfig, identity::PlayerIdentifier};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Duration};
use thiserror::Error;

/// Upstream skin providers, declared in fallback priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkinSource {
    /// Managed identity directory (Drasl)
    Drasl,
    /// Official session server (Mojang)
    Mojang,
    /// Alternate auth server (Ely.by)
    Ely,
}

impl SkinSource {
    /// All sources in priority order
    pub const ALL: [SkinSource; 3] = [SkinSource::Drasl, SkinSource::Mojang, SkinSource::Ely];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkinSource::Drasl => "drasl",
            SkinSource::Mojang => "mojang",
            SkinSource::Ely => "ely",
        }
    }
}

impl fmt::Display for SkinSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a skin texture can be loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureLocation {
    Url(String),
    LocalPath(PathBuf),
}

impl TextureLocation {
    /// Interpret a provider-supplied location; `file://` URLs map to local paths.
    pub fn parse(location: &str) -> Self {
        match location.strip_prefix("file://") {
            Some(path) => TextureLocation::LocalPath(PathBuf::from(path)),
            None => TextureLocation::Url(location.to_string()),
        }
    }
}

impl fmt::Display for TextureLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureLocation::Url(url) => f.write_str(url),
            TextureLocation::LocalPath(path) => write!(f, "file://{}", path.display()),
        }
    }
}

/// Upstream-issued (value, signature) pair. Opaque to rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    pub value: String,
    pub signature: String,
}

/// Result of a successful provider lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureReference {
    pub source: SkinSource,
    pub location: TextureLocation,
    pub signed: Option<SignedPayload>,
}

/// Provider-level failure. Both variants cause fallthrough to the next provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider has no record for this player
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport failure, unexpected status, malformed body or timeout
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotFound(_) => "not_found",
            ProviderError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Unavailable(format!("request timed out: {}", e))
        } else {
            ProviderError::Unavailable(e.to_string())
        }
    }
}

/// Single capability every provider strategy exposes
#[async_trait]
pub trait TextureProvider: Send + Sync {
    /// Which upstream this strategy talks to
    fn source(&self) -> SkinSource;

    /// Resolve a player to a texture reference
    async fn fetch_texture(
        &self,
        identifier: &PlayerIdentifier,
    ) -> Result<TextureReference, ProviderError>;
}

/// Build the shared upstream HTTP client. Every request inherits the timeout.
pub fn build_http_client(config: &UpstreamConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
}

/// Classify an upstream response status.
///
/// 204 and 404 are well-formed "no such player" answers; any other
/// non-2xx status means the upstream is unavailable.
pub(crate) fn check_status(response: Response, what: &str) -> Result<Response, ProviderError> {
    match response.status() {
        StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => {
            Err(ProviderError::NotFound(format!("{} has no record", what)))
        }
        status if status.is_success() => Ok(response),
        status => Err(ProviderError::Unavailable(format!(
            "{} returned {}",
            what, status
        ))),
    }
}

/// Decode a JSON body, treating malformed payloads as an unavailable upstream
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
    what: &str,
) -> Result<T, ProviderError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Unavailable(format!("invalid {} response: {}", what, e)))
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
