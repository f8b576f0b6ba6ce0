use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campaign_search::config::AppConfig;
use campaign_search::server::{self, AppState};
use campaign_search::{indexer, SearchService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_search=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = AppConfig::load()?;

    // First argument overrides the configured snapshot
    if let Some(path) = std::env::args().nth(1) {
        config.snapshot_path = PathBuf::from(path);
    }

    let mut service = SearchService::new(config.search.clone());

    if config.snapshot_path.exists() {
        tracing::info!("📚 Building search index...");
        let documents = indexer::build_index(&config.snapshot_path, &mut service).await?;
        tracing::info!("✅ Search index built with {} documents", documents);
    } else {
        tracing::warn!(
            "Snapshot {} not found, starting with an empty index",
            config.snapshot_path.display()
        );
    }

    let state = AppState::new(service, config.snapshot_path.clone());
    server::serve(config.bind_addr, state).await?;

    Ok(())
}
