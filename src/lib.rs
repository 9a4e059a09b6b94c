//! Block Height Exporter Library
//!
//! Exposes the latest block height known to an Ethereum node and to a
//! block explorer as Prometheus gauges.
//!
//! # Architecture
//!
//! Collection is driven entirely by scrapes. There is no background
//! loop and nothing is cached between scrapes:
//!
//! ```text
//! scrape → MetricsServer → MetricsRegistry → Collector → upstream HTTP
//!                                              ↓
//!                              gauge sample or invalid sample
//! ```
//!
//! # Design Principles
//!
//! - **Stateless collectors**: every scrape fetches fresh values
//! - **Isolated failures**: one failing upstream never hides the other metric
//! - **Bounded fetches**: every upstream request carries a deadline
//! - **Explicit configuration**: settings are resolved once and passed in
//!
//! # Example
//!
//! ```no_run
//! use block_height_exporter::{
//!     collector::{ExplorerBlockCollector, ExplorerConfig, NodeBlockCollector, NodeConfig},
//!     metrics::MetricsRegistry,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = reqwest::Client::new();
//! let mut registry = MetricsRegistry::new();
//! registry.register(NodeBlockCollector::new(
//!     NodeConfig::new("http://127.0.0.1:8545"),
//!     client.clone(),
//! )?)?;
//! registry.register(ExplorerBlockCollector::new(
//!     ExplorerConfig::new("https://api.etherscan.io", "API_KEY"),
//!     client,
//! )?)?;
//!
//! let gathered = registry.gather().await;
//! for failure in &gathered.errors {
//!     eprintln!("{}: {}", failure.metric, failure.error);
//! }
//! println!("{}", gathered.encode()?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod collector;
pub mod config;
pub mod metrics;

// Re-export commonly used types at crate root
pub use collector::{
    BlockHeight, CollectError, Collector, ExplorerBlockCollector, MetricDesc, MetricSample,
    NodeBlockCollector,
};
pub use config::{Cli, ConfigError, ExporterConfig};
pub use metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
