//! Static cluster topology.
//!
//! The cluster graph is a node list plus a 0/1 adjacency matrix indexed in
//! node-list order. The diagonal is conventionally 1: a node is always
//! connected to itself, and degree computation subtracts that self-loop.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TopologyError;

/// Node list and adjacency matrix describing which nodes talk directly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterGraph {
    /// Node addresses; the order is the index space of `edges`
    pub nodes: Vec<String>,
    /// `edges[i][j] == 1` when nodes i and j are directly connected
    pub edges: Vec<Vec<u8>>,
}

impl ClusterGraph {
    /// Build a graph and check its shape
    pub fn new(nodes: Vec<String>, edges: Vec<Vec<u8>>) -> Result<Self, TopologyError> {
        let graph = Self { nodes, edges };
        graph.validate()?;
        Ok(graph)
    }

    /// Check that the matrix is square, sized to the node list and binary.
    ///
    /// Symmetry and the self-loop convention are assumed, not enforced; a
    /// violation is only logged.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.nodes.is_empty() {
            return Err(TopologyError::Malformed("node list is empty".to_string()));
        }

        let n = self.nodes.len();
        if self.edges.len() != n {
            return Err(TopologyError::Malformed(format!(
                "adjacency matrix has {} rows but {} nodes are configured",
                self.edges.len(),
                n
            )));
        }

        for (i, row) in self.edges.iter().enumerate() {
            if row.len() != n {
                return Err(TopologyError::Malformed(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            if let Some(bad) = row.iter().find(|&&v| v > 1) {
                return Err(TopologyError::Malformed(format!(
                    "row {} contains value {}, only 0 and 1 are allowed",
                    i, bad
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.as_str()) {
                return Err(TopologyError::Malformed(format!(
                    "node {} is listed more than once",
                    node
                )));
            }
        }

        for i in 0..n {
            if self.edges[i][i] != 1 {
                warn!("Node {} has no self-loop; its degree will be undercounted", self.nodes[i]);
            }
            for j in (i + 1)..n {
                if self.edges[i][j] != self.edges[j][i] {
                    warn!(
                        "Adjacency matrix is not symmetric between {} and {}",
                        self.nodes[i], self.nodes[j]
                    );
                }
            }
        }

        Ok(())
    }

    /// Position of an address in the node list
    pub fn index_of(&self, address: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n == address)
    }

    /// Locate this node's own address in the topology
    pub fn resolve_self(&self, address: &str) -> Result<usize, TopologyError> {
        self.index_of(address)
            .ok_or_else(|| TopologyError::NotInTopology(address.to_string()))
    }

    /// Direct neighbors of the node at `index`, in column order, self excluded
    pub fn neighbors(&self, index: usize) -> Vec<String> {
        let Some(row) = self.edges.get(index) else {
            return Vec::new();
        };

        row.iter()
            .enumerate()
            .filter(|&(j, &v)| v == 1 && j != index)
            .map(|(j, _)| self.nodes[j].clone())
            .collect()
    }

    /// Row sum minus the self-loop for the node at `index`
    pub fn degree_at(&self, index: usize) -> usize {
        self.edges
            .get(index)
            .map(|row| row.iter().map(|&v| v as usize).sum::<usize>())
            .unwrap_or(0)
            .saturating_sub(1)
    }

    /// Degree of the node with the given address
    pub fn degree(&self, address: &str) -> Result<usize, TopologyError> {
        let index = self
            .index_of(address)
            .ok_or_else(|| TopologyError::NodeNotFound(address.to_string()))?;
        Ok(self.degree_at(index))
    }
}
