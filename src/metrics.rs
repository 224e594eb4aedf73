/// Metrics and telemetry for SkySkins
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Cache hit/miss rates per namespace
/// - Upstream provider outcomes and latencies
/// - Avatar render times
/// - Catalog sync runs

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram, register_histogram_vec, register_int_counter_vec,
    Encoder, Gauge, Histogram, HistogramVec, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== Cache Metrics ==========

    /// Cache hits by namespace
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_hits_total",
        "Total number of cache hits",
        &["namespace"]
    )
    .unwrap();

    /// Cache misses by namespace (read failures count as misses)
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_misses_total",
        "Total number of cache misses",
        &["namespace"]
    )
    .unwrap();

    /// Cache backend errors by operation
    pub static ref CACHE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_errors_total",
        "Total number of cache backend errors",
        &["operation"]
    )
    .unwrap();

    // ========== Provider Metrics ==========

    /// Provider lookups by source and outcome
    pub static ref PROVIDER_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "provider_requests_total",
        "Total number of upstream provider lookups",
        &["source", "outcome"]
    )
    .unwrap();

    /// Provider lookup duration in seconds
    pub static ref PROVIDER_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "provider_request_duration_seconds",
        "Upstream provider lookup latencies in seconds",
        &["source"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // ========== Render Metrics ==========

    /// Face render duration in seconds
    pub static ref RENDER_DURATION_SECONDS: Histogram = register_histogram!(
        "avatar_render_duration_seconds",
        "Face avatar render latencies in seconds",
        vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Catalog sync runs by result
    pub static ref CATALOG_SYNC_RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "catalog_sync_runs_total",
        "Total number of catalog sync runs",
        &["result"]
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "metrics_encode_failed");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record a cache lookup
pub fn record_cache_access(namespace: &str, hit: bool) {
    if hit {
        CACHE_HITS_TOTAL.with_label_values(&[namespace]).inc();
    } else {
        CACHE_MISSES_TOTAL.with_label_values(&[namespace]).inc();
    }
}

/// Record a cache backend error ("read" or "write")
pub fn record_cache_error(operation: &str) {
    CACHE_ERRORS_TOTAL.with_label_values(&[operation]).inc();
}

/// Record a provider lookup
pub fn record_provider_request(source: &str, outcome: &str, duration: f64) {
    PROVIDER_REQUESTS_TOTAL
        .with_label_values(&[source, outcome])
        .inc();
    PROVIDER_REQUEST_DURATION_SECONDS
        .with_label_values(&[source])
        .observe(duration);
}

/// Record a face render
pub fn record_render(duration: f64) {
    RENDER_DURATION_SECONDS.observe(duration);
}

/// Record a catalog sync run
pub fn record_catalog_sync(result: &str) {
    CATALOG_SYNC_RUNS_TOTAL.with_label_values(&[result]).inc();
}
