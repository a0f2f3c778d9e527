//! Consensus collaborators.
//!
//! The worker drives a job through two seams: a `WeightPolicy` turning the
//! neighbor list into mixing weights, and a `ConsensusEngine` running the
//! iterative computation over a transport channel. Default implementations
//! are Metropolis weights and plain average consensus.

use adac_common::Matrix;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::network::Channel;

pub mod average;
pub mod weights;

pub use average::AverageConsensus;
pub use weights::MetropolisWeights;

/// Tag attached to every consensus run started by the controller
pub const CONSENSUS_TAG: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborWeight {
    /// Neighbor address, optionally with an explicit `:port`
    pub address: String,
    pub weight: f64,
}

/// Mixing weights for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// Address this node announces itself as
    pub node: String,
    pub self_weight: f64,
    pub neighbors: Vec<NeighborWeight>,
}

impl Weights {
    pub fn total(&self) -> f64 {
        self.self_weight + self.neighbors.iter().map(|n| n.weight).sum::<f64>()
    }
}

/// Computes weights from a neighbor list
pub trait WeightPolicy: Send + Sync {
    fn compute(&self, neighbors: &[String]) -> Result<Weights>;
}

/// Runs the iterative computation for one job
#[async_trait]
pub trait ConsensusEngine: Send + Sync {
    async fn run(
        &self,
        data: Matrix,
        iterations: u32,
        tag: u32,
        weights: &Weights,
        channel: &mut dyn Channel,
    ) -> Result<Matrix>;
}
