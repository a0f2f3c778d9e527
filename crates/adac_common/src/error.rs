//! Error types shared by the controller crates.

use std::path::PathBuf;

/// Topology lookup and shape errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// This node's own address is not part of the configured node list
    #[error("Address {0} is not part of the configured topology")]
    NotInTopology(String),

    /// A requested host is not part of the configured node list
    #[error("Node {0} not found in topology")]
    NodeNotFound(String),

    #[error("Malformed topology: {0}")]
    Malformed(String),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error("Could not determine IPv4 address of interface {name}: {reason}")]
    Interface { name: String, reason: String },
}

/// Vector data file errors
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Failed to read data file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line}: '{token}' is not an integer")]
    Parse { line: usize, token: String },

    #[error("Line {line}: expected {expected} values, found {found}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    Shape {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Data set is empty")]
    Empty,
}
