/// Signed texture metadata endpoint
use crate::{context::AppContext, error::AppResult, identity::PlayerIdentifier};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

/// Build texture metadata routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/textures/signed/:id", get(signed_textures))
}

/// Raw signed-texture JSON, from the catalog or the Ely skinsystem
async fn signed_textures(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let player = PlayerIdentifier::uuid(&id)?;
    let body = ctx.pipeline.texture_data(&player).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}
