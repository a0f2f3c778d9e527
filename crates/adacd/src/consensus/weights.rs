//! Metropolis-Hastings weights from the static topology

use adac_common::ClusterGraph;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use super::{NeighborWeight, WeightPolicy, Weights};

/// `w_ij = 1 / (1 + max(d_i, d_j))`, `w_ii = 1 - sum(w_ij)`
#[derive(Debug, Clone)]
pub struct MetropolisWeights {
    graph: Arc<ClusterGraph>,
    node: String,
}

impl MetropolisWeights {
    pub fn new(graph: Arc<ClusterGraph>, node: impl Into<String>) -> Self {
        Self {
            graph,
            node: node.into(),
        }
    }
}

impl WeightPolicy for MetropolisWeights {
    fn compute(&self, neighbors: &[String]) -> Result<Weights> {
        let own_degree = self
            .graph
            .degree(&self.node)
            .with_context(|| format!("Cannot weight neighbors of {}", self.node))?;

        let neighbors = neighbors
            .iter()
            .map(|address| {
                let degree = self
                    .graph
                    .degree(address)
                    .with_context(|| format!("Cannot weight neighbor {}", address))?;
                Ok(NeighborWeight {
                    address: address.clone(),
                    weight: 1.0 / (1.0 + own_degree.max(degree) as f64),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let self_weight = 1.0 - neighbors.iter().map(|n| n.weight).sum::<f64>();
        debug!(
            "Weights for {}: self {:.4}, {} neighbors",
            self.node,
            self_weight,
            neighbors.len()
        );

        Ok(Weights {
            node: self.node.clone(),
            self_weight,
            neighbors,
        })
    }
}
