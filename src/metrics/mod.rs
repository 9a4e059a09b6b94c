//! Prometheus exposition of the collected block heights.
//!
//! The [`MetricsRegistry`] owns every registered
//! [`Collector`](crate::collector::Collector) and runs them on demand;
//! the [`MetricsServer`] turns each inbound scrape into one
//! [`MetricsRegistry::gather`] call and serves the result in the
//! Prometheus text format.
//!
//! # Metrics Exposed
//!
//! - `parity_last_block` - Latest block reported by the node's JSON-RPC
//! - `etherscan_last_block` - Latest block reported by the block explorer
//!
//! A metric whose upstream fails during a scrape is omitted from that
//! scrape and the failure is logged; the other metrics are unaffected.
//!
//! # Example
//!
//! ```no_run
//! use block_height_exporter::collector::{NodeBlockCollector, NodeConfig};
//! use block_height_exporter::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = reqwest::Client::new();
//! let mut registry = MetricsRegistry::new();
//! registry.register(NodeBlockCollector::new(NodeConfig::new("http://127.0.0.1:8545"), client)?)?;
//!
//! MetricsServer::new(MetricsServerConfig::with_port(9101), registry)
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod registry;
mod server;

pub use registry::{CollectFailure, Gathered, MetricsError, MetricsRegistry};
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
