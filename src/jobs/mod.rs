use crate::{catalog::CatalogSync, context::AppContext, metrics};
use std::sync::Arc;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        match self.context.catalog_sync.clone() {
            Some(sync) => {
                tokio::spawn(Self::catalog_sync_job(Arc::clone(&self), sync));
            }
            None => info!("Catalog sync not configured - job disabled"),
        }

        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Re-sign changed roster skins (default: daily)
    async fn catalog_sync_job(scheduler: Arc<Self>, sync: Arc<CatalogSync>) {
        let period = Duration::from_secs(scheduler.context.config.catalog.sync_interval_secs);
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            info!("Running catalog sync");

            match tasks::sync_catalog(&sync).await {
                Some(Ok(summary)) => {
                    if summary.updated > 0 {
                        info!("Catalog sync stored {} new signature(s)", summary.updated);
                    }
                }
                Some(Err(e)) => error!("Catalog sync failed: {}", e),
                None => {}
            }
        }
    }

    /// Component health and uptime gauge (runs every minute)
    async fn health_check_job(scheduler: Arc<Self>) {
        let started = Instant::now();
        let mut interval = interval(Duration::from_secs(60));

        loop {
            interval.tick().await;
            metrics::UPTIME_SECONDS.set(started.elapsed().as_secs_f64());

            if let Err(e) = tasks::health_check(&scheduler.context).await {
                warn!("Health check failed: {}", e);
            }
        }
    }
}
