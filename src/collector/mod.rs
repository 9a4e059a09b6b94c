//! Scrape-driven block height collectors.
//!
//! A [`Collector`] describes one static metric and produces a fresh
//! sample for it every time the registry asks. Collectors hold no state
//! across scrapes: each call to [`Collector::collect`] fetches from the
//! upstream, parses the answer, and reports either a gauge value or the
//! error that prevented one.
//!
//! Two upstreams are supported:
//!
//! - [`NodeBlockCollector`] asks a node for `eth_blockNumber` over JSON-RPC
//! - [`ExplorerBlockCollector`] asks a block explorer's proxy API

mod explorer;
mod height;
mod node;

pub use explorer::{ExplorerBlockCollector, ExplorerConfig, EXPLORER_METRIC_NAME};
pub use height::{BlockHeight, ParseHeightError};
pub use node::{NodeBlockCollector, NodeConfig, RpcError, NODE_METRIC_NAME};

use async_trait::async_trait;
use prometheus::core::Desc;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Default upper bound for a single upstream request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors that prevent a collector from producing a value.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The request could not be completed: refused, timed out, DNS
    /// failure, or the body could not be read.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The upstream answered with a non-2xx status.
    #[error("incorrect response code: {0}")]
    Status(u16),
    /// The JSON-RPC envelope carried an error object.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// The body was not the expected JSON shape.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// The reported height was not an unsigned 64-bit integer.
    #[error(transparent)]
    Height(#[from] ParseHeightError),
    /// The value could not be turned into a metric family.
    #[error("metric error: {0}")]
    Metric(#[from] prometheus::Error),
}

impl CollectError {
    /// Coarse failure class, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            CollectError::Transport(_) => "transport",
            CollectError::Status(_) => "protocol",
            CollectError::Rpc(_) => "application",
            CollectError::Decode(_) | CollectError::Height(_) => "decode",
            CollectError::Metric(_) => "internal",
        }
    }
}

/// Static shape of the single metric a collector produces.
#[derive(Debug, Clone)]
pub struct MetricDesc {
    desc: Desc,
}

impl MetricDesc {
    /// Creates a label-free description, validating the metric name.
    pub fn new(name: &str, help: &str) -> Result<Self, prometheus::Error> {
        let desc = Desc::new(name.to_string(), help.to_string(), Vec::new(), HashMap::new())?;
        Ok(Self { desc })
    }

    /// Fully qualified metric name.
    pub fn name(&self) -> &str {
        &self.desc.fq_name
    }

    /// Help text.
    pub fn help(&self) -> &str {
        &self.desc.help
    }
}

/// Result of a single collection.
#[derive(Debug)]
pub enum MetricSample {
    /// A valid gauge reading.
    Gauge(f64),
    /// The metric could not be computed this scrape.
    Invalid(CollectError),
}

impl MetricSample {
    /// Converts a fetch result into a sample.
    pub fn from_height(result: Result<BlockHeight, CollectError>) -> Self {
        match result {
            Ok(height) => MetricSample::Gauge(height.as_f64()),
            Err(e) => MetricSample::Invalid(e),
        }
    }

    /// Returns the gauge value, if the collection succeeded.
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricSample::Gauge(v) => Some(*v),
            MetricSample::Invalid(_) => None,
        }
    }
}

/// A source of one metric, driven by the registry on every scrape.
///
/// Implementations must be safe to call concurrently: overlapping
/// scrapes may invoke `collect` on the same instance at the same time.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Describes the metric this collector emits.
    fn describe(&self) -> &MetricDesc;

    /// Fetches a fresh value. Failures are reported in the sample,
    /// never by panicking.
    async fn collect(&self) -> MetricSample;
}

/// Joins a base address and a path without doubling the separator.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
