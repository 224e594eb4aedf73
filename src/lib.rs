//! SkySkins - player face avatar service
//!
//! Resolves a player UUID or username through Drasl, Mojang or Ely.by,
//! renders a 96x96 face from the skin texture and serves it from a
//! 48-hour cache.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod identity;
pub mod jobs;
pub mod metrics;
pub mod pipeline;
pub mod providers;
pub mod render;
pub mod server;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{AppError, AppResult};
