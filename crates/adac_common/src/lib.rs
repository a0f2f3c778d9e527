//! Shared types for the ADAC node controller.
//!
//! Configuration loading, the static cluster topology and the vector data
//! loader live here so that the daemon and its tests share one definition.

pub mod config;
pub mod data;
pub mod error;
pub mod netif;
pub mod topology;

pub use config::{
    ConsensusConfig, DataConfig, LoggingConfig, NodeConfig, NodeRunnerConfig, DEFAULT_CONFIG_PATH,
};
pub use data::{load_vectors, parse_vectors, Matrix};
pub use error::{ConfigError, DataError, TopologyError};
pub use topology::ClusterGraph;
