//! Node collector: `eth_blockNumber` over JSON-RPC.

use super::{BlockHeight, CollectError, Collector, MetricDesc, MetricSample, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Metric name exposed for the node's chain head.
pub const NODE_METRIC_NAME: &str = "parity_last_block";
const NODE_METRIC_HELP: &str = "Parity last block";

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Connection settings for the node's JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// JSON-RPC URL, e.g. `http://127.0.0.1:8545`.
    pub url: String,
    /// Deadline for the whole request, from connect to the last body byte.
    pub timeout: Duration,
}

impl NodeConfig {
    /// Creates a config with the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    method: &'static str,
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Error object from a JSON-RPC response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    /// JSON-RPC error code, zero when absent.
    #[serde(default)]
    pub code: i64,
    /// Human-readable message, possibly empty.
    #[serde(default)]
    pub message: String,
    /// Optional server-defined payload.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "json-rpc error {}", self.code)
        } else {
            f.write_str(&self.message)
        }
    }
}

impl std::error::Error for RpcError {}

/// Reports the chain head seen by a node as `parity_last_block`.
pub struct NodeBlockCollector {
    config: NodeConfig,
    client: reqwest::Client,
    desc: MetricDesc,
}

impl NodeBlockCollector {
    /// Creates a collector that queries `config.url` with `client`.
    pub fn new(config: NodeConfig, client: reqwest::Client) -> Result<Self, prometheus::Error> {
        Ok(Self {
            config,
            client,
            desc: MetricDesc::new(NODE_METRIC_NAME, NODE_METRIC_HELP)?,
        })
    }

    /// Fetches the node's latest block number.
    pub async fn last_block(&self) -> Result<BlockHeight, CollectError> {
        let body = serde_json::to_vec(&RpcRequest {
            jsonrpc: "2.0",
            method: "eth_blockNumber",
            id: request_id(),
        })?;

        let resp = self
            .client
            .post(&self.config.url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .timeout(self.config.timeout)
            .body(body)
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

/// Extracts the height from a JSON-RPC response body.
fn parse_response(body: &[u8]) -> Result<BlockHeight, CollectError> {
    let resp: RpcResponse = serde_json::from_slice(body)?;
    if let Some(error) = resp.error {
        return Err(error.into());
    }
    let result = resp.result.unwrap_or_default();
    Ok(result.parse::<BlockHeight>()?)
}

/// Ids only need to differ between overlapping calls.
fn request_id() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

#[async_trait]
impl Collector for NodeBlockCollector {
    fn describe(&self) -> &MetricDesc {
        &self.desc
    }

    async fn collect(&self) -> MetricSample {
        let result = self.last_block().await;
        if let Ok(height) = &result {
            tracing::debug!(url = %self.config.url, height = %height, "node block height fetched");
        }
        MetricSample::from_height(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Instant;

    fn collector(url: String) -> NodeBlockCollector {
        NodeBlockCollector::new(NodeConfig::new(url), reqwest::Client::new()).unwrap()
    }

    #[test]
    fn test_describe() {
        let collector = collector("http://127.0.0.1:8545".to_string());
        assert_eq!(collector.describe().name(), "parity_last_block");
        assert_eq!(collector.describe().help(), "Parity last block");
    }

    #[test]
    fn test_parse_hex_result() {
        let height = parse_response(br#"{"jsonrpc":"2.0","id":1,"result":"0x10d4f"}"#).unwrap();
        assert_eq!(height, BlockHeight(68943));
    }

    #[test]
    fn test_rpc_error_skips_result() {
        let err = parse_response(
            br#"{"result":"not a number","error":{"code":-32000,"message":"boom"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CollectError::Rpc(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_rpc_error_without_message() {
        let err = parse_response(br#"{"error":{"code":-32000,"message":""}}"#).unwrap_err();
        assert_eq!(err.to_string(), "json-rpc error -32000");

        let err = parse_response(br#"{"error":{"code":-32601}}"#).unwrap_err();
        assert_eq!(err.to_string(), "json-rpc error -32601");
    }

    #[test]
    fn test_rpc_error_without_code() {
        let err = parse_response(br#"{"error":{"message":"boom"}}"#).unwrap_err();
        assert!(matches!(err, CollectError::Rpc(_)));
        assert_eq!(err.to_string(), "boom");

        let err = parse_response(br#"{"error":{}}"#).unwrap_err();
        assert_eq!(err.kind(), "application");
        assert_eq!(err.to_string(), "json-rpc error 0");
    }

    #[test]
    fn test_null_error_is_ignored() {
        let height = parse_response(br#"{"result":"0x1","error":null}"#).unwrap();
        assert_eq!(height, BlockHeight(1));
    }

    #[test]
    fn test_malformed_bodies() {
        assert!(matches!(
            parse_response(b"<html>bad gateway</html>"),
            Err(CollectError::Decode(_))
        ));
        assert!(matches!(
            parse_response(br#"{"result":12}"#),
            Err(CollectError::Decode(_))
        ));
        assert!(matches!(
            parse_response(br#"{"jsonrpc":"2.0"}"#),
            Err(CollectError::Height(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(RpcRequest {
            jsonrpc: "2.0",
            method: "eth_blockNumber",
            id: 7,
        })
        .unwrap();
        assert_eq!(body, json!({"jsonrpc": "2.0", "method": "eth_blockNumber", "id": 7}));
    }

    #[tokio::test]
    async fn test_collect_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .header("content-type", "application/json; charset=utf-8")
                    .json_body_partial(r#"{"jsonrpc":"2.0","method":"eth_blockNumber"}"#);
                then.status(200)
                    .json_body(json!({"jsonrpc": "2.0", "id": 1, "result": "0x10d4f"}));
            })
            .await;

        let collector = collector(server.url("/"));
        let sample = collector.collect().await;

        mock.assert_async().await;
        assert_eq!(sample.value(), Some(68943.0));
    }

    #[tokio::test]
    async fn test_collect_status_error_ignores_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500).json_body(json!({"result": "0x1"}));
            })
            .await;

        let collector = collector(server.url("/"));
        let err = collector.last_block().await.unwrap_err();

        assert!(matches!(err, CollectError::Status(500)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_collect_rpc_error_is_invalid_sample() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .json_body(json!({"error": {"code": -32000, "message": "boom"}}));
            })
            .await;

        let collector = collector(server.url("/"));
        match collector.collect().await {
            MetricSample::Invalid(err) => assert_eq!(err.to_string(), "boom"),
            other => panic!("expected invalid sample, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_collects_are_independent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({"result": "0x10d4f"}));
            })
            .await;

        let collector = collector(server.url("/"));
        let (a, b) = tokio::join!(collector.last_block(), collector.last_block());

        assert_eq!(a.unwrap(), BlockHeight(68943));
        assert_eq!(b.unwrap(), BlockHeight(68943));
        mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn test_unresponsive_upstream_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .json_body(json!({"result": "0x1"}))
                    .delay(Duration::from_secs(5));
            })
            .await;

        let collector = collector(server.url("/"));
        let started = Instant::now();
        let err = collector.last_block().await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(3));
        match err {
            CollectError::Transport(e) => assert!(e.is_timeout()),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let collector = collector("http://127.0.0.1:1".to_string());
        let err = collector.last_block().await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }
}
