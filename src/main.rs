use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use merpati_news::config::Config;
use merpati_news::fetcher::Fetcher;
use merpati_news::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "merpati_news=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);
    if config.has_api_key() {
        info!("News provider credential configured");
    } else {
        warn!("GNEWS_API_KEY is not set, every request will be served fallback articles");
    }
    info!("Using news provider at {}", config.upstream.base_url);

    let fetcher = Fetcher::new(config.clone())?;
    let state = Arc::new(AppState { fetcher });
    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
