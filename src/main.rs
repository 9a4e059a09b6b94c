//! Block Height Exporter CLI
//!
//! Serves the node and explorer block heights for Prometheus scrapes.

use block_height_exporter::{
    collector::{ExplorerBlockCollector, NodeBlockCollector},
    Cli, ExporterConfig, MetricsRegistry, MetricsServer,
};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = match ExporterConfig::load(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: ExporterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let server_config = config.server();
    let client = reqwest::Client::builder().build()?;

    let mut registry = MetricsRegistry::new();
    registry.register(NodeBlockCollector::new(config.node, client.clone())?)?;
    registry.register(ExplorerBlockCollector::new(config.explorer, client)?)?;

    info!(
        "Parity/Etherscan prometheus exporter v{} started on port {}",
        block_height_exporter::VERSION,
        config.port
    );

    MetricsServer::new(server_config, registry).run().await?;
    Ok(())
}
