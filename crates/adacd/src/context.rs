//! Everything a node needs to serve requests and run jobs.
//!
//! Built once at startup from the loaded configuration and shared behind an
//! `Arc` by the HTTP handlers and the worker task.

use adac_common::{ClusterGraph, NodeConfig};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::consensus::{AverageConsensus, ConsensusEngine, MetropolisWeights, WeightPolicy};
use crate::job::JobStateGuard;
use crate::network::{FanoutNotifier, HttpStartClient, StartClient, Transport, UdpTransport};

pub struct NodeContext {
    pub graph: Arc<ClusterGraph>,
    /// This node's address as listed in the topology
    pub self_address: String,
    pub control_port: u16,
    pub udp_port: u16,
    pub data_file: PathBuf,
    pub guard: JobStateGuard,
    pub notifier: FanoutNotifier,
    pub transport: Arc<dyn Transport>,
    pub weights: Arc<dyn WeightPolicy>,
    pub engine: Arc<dyn ConsensusEngine>,
}

impl NodeContext {
    /// Wire the default collaborators from configuration
    pub fn from_config(config: &NodeConfig, self_address: String) -> Result<Self> {
        let graph = Arc::new(config.graph.clone());

        let client = HttpStartClient::new(Duration::from_millis(
            config.node_runner.fanout_timeout_ms,
        ))
        .context("Failed to build neighbor HTTP client")?;

        let weights = MetropolisWeights::new(Arc::clone(&graph), self_address.clone());
        let engine = AverageConsensus::new(Duration::from_millis(config.consensus.round_timeout_ms));

        Ok(Self {
            graph,
            self_address,
            control_port: config.node_runner.port,
            udp_port: config.consensus.udp_port,
            data_file: PathBuf::from(&config.data.file),
            guard: JobStateGuard::new(),
            notifier: FanoutNotifier::new(Arc::new(client)),
            transport: Arc::new(UdpTransport::default()),
            weights: Arc::new(weights),
            engine: Arc::new(engine),
        })
    }

    pub fn with_start_client(mut self, client: Arc<dyn StartClient>) -> Self {
        self.notifier = FanoutNotifier::new(client);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_weights(mut self, weights: Arc<dyn WeightPolicy>) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_engine(mut self, engine: Arc<dyn ConsensusEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Neighbors of this node, if it is part of the topology
    pub fn neighbors(&self) -> Result<Vec<String>, adac_common::TopologyError> {
        let index = self.graph.resolve_self(&self.self_address)?;
        Ok(self.graph.neighbors(index))
    }
}
