/// Face avatar endpoints
///
/// `/d`, `/m` and `/e` serve a single provider; `/a` walks every configured
/// provider in priority order.
use crate::{
    context::AppContext,
    error::AppResult,
    identity::PlayerIdentifier,
    providers::SkinSource,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Browser cache lifetime, matching the server-side TTL
const CACHE_CONTROL: &str = "public, max-age=172800";

/// Build avatar routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/d/:id", get(drasl_avatar))
        .route("/m/:id", get(mojang_avatar))
        .route("/e/:id", get(ely_avatar))
        .route("/a/:id", get(aggregate_avatar))
}

#[derive(Debug, Deserialize)]
pub struct AggregateParams {
    pub username: Option<String>,
}

async fn drasl_avatar(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let player = PlayerIdentifier::uuid(&id)?;
    single_source(&ctx, SkinSource::Drasl, &player, &headers).await
}

async fn mojang_avatar(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let player = PlayerIdentifier::uuid(&id)?;
    single_source(&ctx, SkinSource::Mojang, &player, &headers).await
}

/// Ely accepts usernames, hyphenated ones included, as well as UUIDs
async fn ely_avatar(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let player = PlayerIdentifier::parse(&id)?;
    single_source(&ctx, SkinSource::Ely, &player, &headers).await
}

async fn single_source(
    ctx: &AppContext,
    source: SkinSource,
    player: &PlayerIdentifier,
    headers: &HeaderMap,
) -> AppResult<Response> {
    let bytes = ctx.pipeline.avatar(source, player).await?;
    Ok(png_response(bytes, headers))
}

async fn aggregate_avatar(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Query(params): Query<AggregateParams>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let player = PlayerIdentifier::uuid(&id)?;
    let username = params
        .username
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .map(PlayerIdentifier::username)
        .transpose()?;

    let bytes = ctx
        .pipeline
        .aggregate_avatar(&player, username.as_ref())
        .await?;
    Ok(png_response(bytes, &headers))
}

/// Strong validator over the rendered bytes
pub fn etag_for(bytes: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(bytes)))
}

/// PNG response with caching headers; a matching `If-None-Match` yields 304
fn png_response(bytes: Vec<u8>, headers: &HeaderMap) -> Response {
    let etag = etag_for(&bytes);

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').any(|tag| tag.trim() == etag || tag.trim() == "*"))
        .unwrap_or(false);

    if not_modified {
        return (
            StatusCode::NOT_MODIFIED,
            [(header::ETAG, etag), (header::CACHE_CONTROL, CACHE_CONTROL.to_string())],
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
        ],
        bytes,
    )
        .into_response()
}
