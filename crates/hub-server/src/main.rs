//! # hub-server
//!
//! Entry point for the identity federation hub.

#![forbid(unsafe_code)]

use hub_server::{Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(hub_entity_id = %config.hub.hub_entity_id, "hub starting");

    Server::new(config).await?.run().await
}
