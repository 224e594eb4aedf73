/// SkySkins - player face avatar service
use skyskins::{jobs, server, AppContext, AppResult, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyskins=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    let config = ServerConfig::from_env()?;

    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   _____ __          _____ __   _
  / ___// /____  __ / ___// /__(_)___  _____
  \__ \/ //_/ / / / \__ \/ //_/ / __ \/ ___/
 ___/ / ,< / /_/ / ___/ / ,< / / / / (__  )
/____/_/|_|\__, / /____/_/|_/_/_/ /_/____/
          /____/
        Face avatar service v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
