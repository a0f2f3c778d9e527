//! Consensus job worker.
//!
//! Runs one admitted job end to end in a detached task:
//!
//! 1. open the UDP channel and start listening
//! 2. resolve neighbors and weights
//! 3. tell neighbors to start their own job
//! 4. load the data set
//! 5. run the engine
//!
//! Whatever happens, the channel is closed and only then is the job guard
//! released. Failures end the job and are only visible in the logs; the
//! request that admitted the job has already been answered.

use adac_common::{load_vectors, Matrix};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::consensus::CONSENSUS_TAG;
use crate::context::NodeContext;
use crate::job::JobTicket;
use crate::network::Channel;

/// How a job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// The transport channel could not be opened
    ChannelUnavailable,
    /// Topology, data or engine error after the channel was open
    Failed,
}

pub struct ConsensusWorker {
    node: Arc<NodeContext>,
    ticket: JobTicket,
}

impl ConsensusWorker {
    pub fn new(node: Arc<NodeContext>, ticket: JobTicket) -> Self {
        Self { node, ticket }
    }

    /// Run the job on its own task, detached from the caller
    pub fn spawn(self) -> JoinHandle<JobOutcome> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) -> JobOutcome {
        let Self { node, ticket } = self;
        let job_id = ticket.id();
        let iterations = ticket.iterations();
        info!("[JOB {}] Task was kicked off ({} iterations)", job_id, iterations);

        let mut channel = match open_channel(&node).await {
            Ok(channel) => channel,
            Err(e) => {
                error!("[JOB {}] Could not acquire transport channel: {:#}", job_id, e);
                node.guard.release(ticket);
                return JobOutcome::ChannelUnavailable;
            }
        };

        let outcome = match execute(&node, iterations, channel.as_mut()).await {
            Ok(result) => {
                info!("~~~~~~~~~~~~~~CONSENSUS DATA BELOW~~~~~~~~~~~~~~~~");
                info!("\n{}", result);
                info!("~~~~~~~~~~~~~~CONSENSUS DATA ABOVE~~~~~~~~~~~~~~~~");
                info!("[JOB {}] Consensus completed", job_id);
                JobOutcome::Completed
            }
            Err(e) => {
                error!("[JOB {}] Consensus failed: {:#}", job_id, e);
                JobOutcome::Failed
            }
        };

        if let Err(e) = channel.close().await {
            warn!("[JOB {}] Error closing transport channel: {}", job_id, e);
        }
        drop(channel);

        node.guard.release(ticket);
        info!("[JOB {}] Finished with outcome {:?}", job_id, outcome);
        outcome
    }
}

async fn open_channel(node: &NodeContext) -> Result<Box<dyn Channel>> {
    debug!("Communicating on UDP port {}", node.udp_port);
    let mut channel = node
        .transport
        .open(node.udp_port)
        .await
        .with_context(|| format!("Failed to open channel on UDP port {}", node.udp_port))?;

    if let Err(e) = channel.listen().await {
        if let Err(close_err) = channel.close().await {
            warn!(
                "Error closing transport channel after failed listen: {}",
                close_err
            );
        }
        return Err(e).with_context(|| format!("Failed to listen on UDP port {}", node.udp_port));
    }
    Ok(channel)
}

async fn execute(node: &NodeContext, iterations: u32, channel: &mut dyn Channel) -> Result<Matrix> {
    let neighbors = node
        .neighbors()
        .context("Cannot resolve this node in the topology")?;
    debug!("Got neighbors {:?}", neighbors);

    let weights = node
        .weights
        .compute(&neighbors)
        .context("Failed to compute neighbor weights")?;
    debug!("Got weights {:?}", weights);

    node.notifier
        .notify_all(&neighbors, iterations, node.control_port)
        .await;

    let path = node.data_file.clone();
    let data = tokio::task::spawn_blocking(move || load_vectors(&path))
        .await
        .context("Data loader task failed")?
        .with_context(|| format!("Failed to load data from {}", node.data_file.display()))?;
    let (rows, cols) = data.shape();
    debug!("Loaded data ({} x {})", rows, cols);

    node.engine
        .run(data, iterations, CONSENSUS_TAG, &weights, channel)
        .await
        .context("Consensus engine failed")
}
