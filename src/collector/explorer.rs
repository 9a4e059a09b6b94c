//! Explorer collector: the `proxy` module of an Etherscan-style API.

use super::{
    endpoint, BlockHeight, CollectError, Collector, MetricDesc, MetricSample, DEFAULT_TIMEOUT,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Metric name exposed for the explorer's chain head.
pub const EXPLORER_METRIC_NAME: &str = "etherscan_last_block";
const EXPLORER_METRIC_HELP: &str = "Etherscan last block";

/// Connection settings for the block explorer API.
#[derive(Clone)]
pub struct ExplorerConfig {
    /// API base address, e.g. `https://api.etherscan.io`.
    pub url: String,
    /// API key sent as the `apikey` query parameter.
    pub api_key: String,
    /// Deadline for the whole request.
    pub timeout: Duration,
}

impl ExplorerConfig {
    /// Creates a config with the default timeout.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for ExplorerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplorerConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    #[serde(default)]
    result: Option<String>,
}

/// Reports the chain head seen by a block explorer as `etherscan_last_block`.
pub struct ExplorerBlockCollector {
    config: ExplorerConfig,
    client: reqwest::Client,
    desc: MetricDesc,
}

impl ExplorerBlockCollector {
    /// Creates a collector that queries `config.url` with `client`.
    pub fn new(config: ExplorerConfig, client: reqwest::Client) -> Result<Self, prometheus::Error> {
        Ok(Self {
            config,
            client,
            desc: MetricDesc::new(EXPLORER_METRIC_NAME, EXPLORER_METRIC_HELP)?,
        })
    }

    /// Fetches the explorer's latest block number.
    pub async fn last_block(&self) -> Result<BlockHeight, CollectError> {
        let resp = self
            .client
            .get(endpoint(&self.config.url, "/api"))
            .query(&[
                ("module", "proxy"),
                ("action", "eth_blockNumber"),
                ("apikey", self.config.api_key.as_str()),
            ])
            .timeout(self.config.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollectError::Status(status.as_u16()));
        }

        let bytes = resp.bytes().await?;
        parse_response(&bytes)
    }
}

/// Extracts the height from a proxy response body. Error payloads carry
/// their message in `result` and fail height parsing.
fn parse_response(body: &[u8]) -> Result<BlockHeight, CollectError> {
    let resp: ProxyResponse = serde_json::from_slice(body)?;
    let result = resp.result.unwrap_or_default();
    Ok(result.parse::<BlockHeight>()?)
}

#[async_trait]
impl Collector for ExplorerBlockCollector {
    fn describe(&self) -> &MetricDesc {
        &self.desc
    }

    async fn collect(&self) -> MetricSample {
        let result = self.last_block().await;
        if let Ok(height) = &result {
            tracing::debug!(url = %self.config.url, height = %height, "explorer block height fetched");
        }
        MetricSample::from_height(result)
    }
}
