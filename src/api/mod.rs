/// API routes and handlers
pub mod avatar;
pub mod health;
pub mod textures;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(avatar::routes())
        .merge(textures::routes())
        .merge(health::routes())
}
