//! Node configuration.
//!
//! Loaded once at startup from a TOML file (default `params.toml`) and shared
//! read-only with every component afterwards.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::netif;
use crate::topology::ClusterGraph;

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "params.toml";

/// Full node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub graph: ClusterGraph,
    pub consensus: ConsensusConfig,
    pub node_runner: NodeRunnerConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Consensus transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// UDP port the worker listens on; all nodes use the same port
    pub udp_port: u16,

    /// How long a round waits for neighbor values before moving on
    #[serde(default = "default_round_timeout")]
    pub round_timeout_ms: u64,
}

fn default_round_timeout() -> u64 {
    5_000
}

/// HTTP controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRunnerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port, also the port used to reach neighbors' controllers
    pub port: u16,

    /// Interface whose IPv4 address identifies this node
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Explicit address of this node, takes precedence over `interface`
    #[serde(default)]
    pub self_address: Option<String>,

    /// Per-neighbor timeout for start requests
    #[serde(default = "default_fanout_timeout")]
    pub fanout_timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_interface() -> String {
    "wlan0".to_string()
}

fn default_fanout_timeout() -> u64 {
    2_500
}

impl NodeRunnerConfig {
    /// This node's address as it appears in `graph.nodes`
    pub fn resolve_self_address(&self) -> Result<String, ConfigError> {
        if let Some(addr) = &self.self_address {
            debug!("Using configured self address {}", addr);
            return Ok(addr.clone());
        }
        let ip = netif::interface_ipv4(&self.interface)?;
        debug!("Interface {} has address {}", self.interface, ip);
        Ok(ip.to_string())
    }
}

/// Input data settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub file: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level name (`debug`, `info`, ...) or numeric level (10..=50)
    #[serde(default = "default_log_level", deserialize_with = "level_from_name_or_number")]
    pub level: String,

    /// Log file appended to in addition to stdout
    #[serde(default)]
    pub log_file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn level_from_name_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawLevel {
        Name(String),
        Number(i64),
    }

    Ok(match RawLevel::deserialize(deserializer)? {
        RawLevel::Name(name) => name,
        RawLevel::Number(n) => n.to_string(),
    })
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_file: None,
        }
    }
}

impl LoggingConfig {
    /// Level as a tracing filter directive; numeric levels map the way
    /// DEBUG=10, INFO=20, WARNING=30, ERROR=40, CRITICAL=50 do
    pub fn filter_directive(&self) -> String {
        let level = self.level.trim();
        match level.parse::<u32>() {
            Ok(n) if n < 10 => "trace".to_string(),
            Ok(n) if n < 20 => "debug".to_string(),
            Ok(n) if n < 30 => "info".to_string(),
            Ok(n) if n < 40 => "warn".to_string(),
            Ok(_) => "error".to_string(),
            Err(_) => match level.to_ascii_lowercase().as_str() {
                "warning" => "warn".to_string(),
                "critical" | "fatal" => "error".to_string(),
                other => other.to_string(),
            },
        }
    }
}

impl NodeConfig {
    /// Load and validate the configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: NodeConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;

        info!(
            "Loaded topology with {} nodes, controller port {}, UDP port {}",
            config.graph.nodes.len(),
            config.node_runner.port,
            config.consensus.udp_port
        );
        Ok(config)
    }

    /// Parse from a TOML string without touching the filesystem
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: "<inline>".into(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.graph.validate()?;

        if self.node_runner.port == 0 {
            return Err(ConfigError::Invalid("node_runner.port must be non-zero".to_string()));
        }
        if self.consensus.udp_port == 0 {
            return Err(ConfigError::Invalid("consensus.udp_port must be non-zero".to_string()));
        }
        if self.data.file.trim().is_empty() {
            return Err(ConfigError::Invalid("data.file must not be empty".to_string()));
        }
        if self.node_runner.fanout_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "node_runner.fanout_timeout_ms must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TopologyError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[graph]
nodes = ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
edges = [[1, 1, 0], [1, 1, 1], [0, 1, 1]]

[consensus]
udp_port = 9999

[node_runner]
host = "0.0.0.0"
port = 9090
self_address = "10.0.0.2"

[data]
file = "data.txt"

[logging]
level = "10"
log_file = "node.log"
"#;

    #[test]
    fn test_parse_sample() {
        let config = NodeConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.graph.nodes.len(), 3);
        assert_eq!(config.consensus.udp_port, 9999);
        assert_eq!(config.consensus.round_timeout_ms, 5_000);
        assert_eq!(config.node_runner.port, 9090);
        assert_eq!(config.node_runner.interface, "wlan0");
        assert_eq!(config.node_runner.fanout_timeout_ms, 2_500);
        assert_eq!(config.logging.log_file.as_deref(), Some("node.log"));
        assert_eq!(config.logging.filter_directive(), "debug");
        assert_eq!(
            config.node_runner.resolve_self_address().unwrap(),
            "10.0.0.2"
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = NodeConfig::load(file.path()).unwrap();
        assert_eq!(config.data.file, "data.txt");
    }

    #[test]
    fn test_missing_file() {
        let result = NodeConfig::load(Path::new("/nonexistent/adac/params.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_rejects_bad_graph() {
        let bad = SAMPLE.replace("[0, 1, 1]]", "[0, 1]]");
        match NodeConfig::from_toml_str(&bad) {
            Err(ConfigError::Topology(TopologyError::Malformed(_))) => {}
            other => panic!("expected malformed topology, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_missing_section() {
        let bad = SAMPLE.replace("[data]\nfile = \"data.txt\"\n", "");
        assert!(matches!(
            NodeConfig::from_toml_str(&bad),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_log_level_mapping() {
        let mut logging = LoggingConfig::default();
        assert_eq!(logging.filter_directive(), "info");

        logging.level = "WARNING".to_string();
        assert_eq!(logging.filter_directive(), "warn");

        logging.level = "40".to_string();
        assert_eq!(logging.filter_directive(), "error");

        logging.level = "adacd=trace".to_string();
        assert_eq!(logging.filter_directive(), "adacd=trace");
    }

    #[test]
    fn test_numeric_level_in_toml() {
        let config = NodeConfig::from_toml_str(&SAMPLE.replace("level = \"10\"", "level = 30")).unwrap();
        assert_eq!(config.logging.level, "30");
        assert_eq!(config.logging.filter_directive(), "warn");
    }
}
