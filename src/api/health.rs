/// Health check endpoints for liveness and readiness probes
///
/// - Liveness: the process answers at all
/// - Readiness: the cache backend and catalog database respond
///
/// A cache outage only degrades readiness; avatars are still served
/// without it.
use crate::{context::AppContext, metrics};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    pub version: String,

    pub uptime_seconds: f64,

    pub checks: Vec<ComponentHealth>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,

    /// Status: "healthy", "degraded", or "unhealthy"
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/metrics", get(prometheus_metrics))
}

/// Liveness probe
pub async fn liveness_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe with per-component checks
pub async fn readiness_probe(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();
    let checks = vec![check_cache(&ctx).await, check_catalog(&ctx).await];
    let overall_status = determine_overall_status(&checks);

    let status_code = match overall_status.as_str() {
        "unhealthy" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    tracing::info!(
        status = %overall_status,
        duration_ms = start.elapsed().as_millis(),
        "health_check_completed"
    );

    (
        status_code,
        Json(HealthStatus {
            status: overall_status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: metrics::UPTIME_SECONDS.get(),
            checks,
        }),
    )
}

/// Prometheus text exposition
pub async fn prometheus_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

async fn check_cache(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();
    let result = ctx.cache.ping().await;
    // Requests keep working on a cache miss
    let status = if result.is_ok() { "healthy" } else { "degraded" };

    ComponentHealth {
        name: "cache".to_string(),
        status: status.to_string(),
        response_time_ms: Some(start.elapsed().as_millis() as u64),
        error: result.err().map(|e| e.to_string()),
        details: Some(serde_json::json!({ "backend": ctx.cache.backend() })),
    }
}

async fn check_catalog(ctx: &AppContext) -> ComponentHealth {
    let start = Instant::now();
    let result = ctx.catalog.ping().await;
    let status = if result.is_ok() { "healthy" } else { "unhealthy" };

    ComponentHealth {
        name: "catalog".to_string(),
        status: status.to_string(),
        response_time_ms: Some(start.elapsed().as_millis() as u64),
        error: result.err().map(|e| e.to_string()),
        details: Some(serde_json::json!({
            "type": "sqlite",
            "sync_enabled": ctx.catalog_sync.is_some(),
        })),
    }
}

/// Determine overall health status from individual checks
fn determine_overall_status(checks: &[ComponentHealth]) -> String {
    let unhealthy_count = checks.iter().filter(|c| c.status == "unhealthy").count();
    let degraded_count = checks.iter().filter(|c| c.status == "degraded").count();

    if unhealthy_count > 0 {
        "unhealthy".to_string()
    } else if degraded_count > 0 {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}
