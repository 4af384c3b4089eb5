mod config;
mod extract;
mod feed;
mod fetcher;
mod index;
mod normalize;
mod output;
mod pipeline;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::pipeline::Pipeline;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "barta_feed=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("BARTA_FEED_CONFIG").unwrap_or_else(|_| "feed.toml".to_string());
    let config = Config::load_or_default(&config_path)?;
    info!(
        "Loaded {} endpoints from configuration",
        config.endpoints.len()
    );

    let pipeline = Pipeline::new(config)?;
    let summary = pipeline.run().await?;

    if summary.placeholder {
        info!("Feed written with placeholder item only");
    } else {
        info!(
            "Feed written: {} of {} extracted posts published",
            summary.published, summary.extracted
        );
    }

    Ok(())
}
