//! Exporter configuration.
//!
//! Settings come from command-line flags, each of which falls back to an
//! environment variable, and optionally from a TOML file. Flags and
//! environment variables override the file. The result is one immutable
//! [`ExporterConfig`] that is split up and handed to the collectors and
//! the server at startup.

use crate::collector::{ExplorerConfig, NodeConfig, DEFAULT_TIMEOUT};
use crate::metrics::MetricsServerConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Scrape path used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "/";

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("ENDPOINT is invalid: {0:?}")]
    InvalidEndpoint(String),
    #[error("timeout must be greater than zero")]
    InvalidTimeout,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Command-line interface.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "block-height-exporter", version, about)]
pub struct Cli {
    /// Port to serve metrics on.
    #[arg(long, env = "EXPORTER_PORT")]
    pub port: Option<u16>,

    /// JSON-RPC URL of the node.
    #[arg(long, env = "PARITY_URL")]
    pub parity_url: Option<String>,

    /// Base URL of the block explorer API.
    #[arg(long, env = "ETHERSCAN_URL")]
    pub etherscan_url: Option<String>,

    /// Block explorer API key.
    #[arg(long, env = "ETHERSCAN_KEY", hide_env_values = true)]
    pub etherscan_key: Option<String>,

    /// Path the metrics are served on.
    #[arg(long, env = "ENDPOINT")]
    pub endpoint: Option<String>,

    /// Upstream request timeout in milliseconds.
    #[arg(long, env = "EXPORTER_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Optional TOML configuration file.
    #[arg(short, long, env = "EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Configuration file format. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Port to serve metrics on.
    pub port: Option<u16>,
    /// Scrape path.
    pub endpoint: Option<String>,
    /// Upstream request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Node settings.
    #[serde(default)]
    pub node: NodeSection,
    /// Explorer settings.
    #[serde(default)]
    pub explorer: ExplorerSection,
}

/// `[node]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeSection {
    /// JSON-RPC URL.
    pub url: Option<String>,
}

/// `[explorer]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExplorerSection {
    /// API base URL.
    pub url: Option<String>,
    /// API key.
    pub api_key: Option<String>,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        content.parse()
    }
}

impl std::str::FromStr for FileConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Fully resolved exporter configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Port to serve metrics on.
    pub port: u16,
    /// Scrape path, always starting with `/`.
    pub endpoint: String,
    /// Node collector settings.
    pub node: NodeConfig,
    /// Explorer collector settings.
    pub explorer: ExplorerConfig,
}

impl ExporterConfig {
    /// Resolves the configuration from parsed flags, reading the file
    /// named by `--config` if any.
    pub fn load(cli: Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    /// Merges flags over file values and validates the result.
    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let port = cli.port.or(file.port).ok_or(ConfigError::Missing("EXPORTER_PORT"))?;
        let explorer_url = pick(cli.etherscan_url, file.explorer.url)
            .ok_or(ConfigError::Missing("ETHERSCAN_URL"))?;
        let api_key = pick(cli.etherscan_key, file.explorer.api_key)
            .ok_or(ConfigError::Missing("ETHERSCAN_KEY"))?;
        let node_url =
            pick(cli.parity_url, file.node.url).ok_or(ConfigError::Missing("PARITY_URL"))?;

        let endpoint = match pick(cli.endpoint, file.endpoint) {
            Some(endpoint) => endpoint,
            None => {
                tracing::info!("ENDPOINT not provided, using {:?}", DEFAULT_ENDPOINT);
                DEFAULT_ENDPOINT.to_string()
            }
        };
        validate_endpoint(&endpoint)?;

        let timeout = match cli.timeout_ms.or(file.timeout_ms) {
            Some(0) => return Err(ConfigError::InvalidTimeout),
            Some(ms) => Duration::from_millis(ms),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            port,
            endpoint,
            node: NodeConfig {
                url: node_url,
                timeout,
            },
            explorer: ExplorerConfig {
                url: explorer_url,
                api_key,
                timeout,
            },
        })
    }

    /// Server settings derived from this configuration.
    pub fn server(&self) -> MetricsServerConfig {
        MetricsServerConfig {
            path: self.endpoint.clone(),
            ..MetricsServerConfig::with_port(self.port)
        }
    }
}

/// First non-empty value, flags winning over the file.
fn pick(flag: Option<String>, file: Option<String>) -> Option<String> {
    flag.filter(|s| !s.is_empty())
        .or(file.filter(|s| !s.is_empty()))
}

/// The path is served literally, so router pattern characters are rejected.
fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    if !endpoint.starts_with('/')
        || endpoint
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ':' | '*' | '{' | '}'))
    {
        return Err(ConfigError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(())
}
