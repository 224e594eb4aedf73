/// Background task implementations
use crate::{
    catalog::{CatalogSync, SyncError, SyncSummary},
    context::AppContext,
    error::AppResult,
    metrics,
};

/// One guarded catalog sync run; `None` when the previous run is still active
pub async fn sync_catalog(sync: &CatalogSync) -> Option<Result<SyncSummary, SyncError>> {
    let outcome = sync.run_guarded().await;

    let label = match &outcome {
        Some(Ok(summary)) if summary.failed == 0 => "success",
        Some(Ok(_)) => "partial",
        Some(Err(_)) => "error",
        None => "skipped",
    };
    metrics::record_catalog_sync(label);

    outcome
}

/// Health check - verify the catalog database answers
///
/// The cache is not checked here; its failures are already counted per request.
pub async fn health_check(ctx: &AppContext) -> AppResult<()> {
    ctx.catalog.ping().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{MineSkinClient, SqliteCatalog},
        db,
        providers::DraslProvider,
    };
    use std::sync::Arc;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn test_roster_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drasl/api/v2/players"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let sync = CatalogSync::new(
            DraslProvider::new(http.clone(), server.uri(), "token"),
            MineSkinClient::new(http, server.uri(), "token"),
            Arc::new(SqliteCatalog::new(db::create_memory_pool().await.unwrap())),
        );

        let outcome = sync_catalog(&sync).await;
        assert!(matches!(outcome, Some(Err(SyncError::Roster(_)))));
    }
}
