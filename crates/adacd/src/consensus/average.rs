//! Iterative average consensus over UDP.
//!
//! Each round a node sends its current matrix to every neighbor, collects the
//! neighbors' matrices for the same round and mixes them with its weights.
//! Peers start asynchronously, so values for later rounds are buffered and
//! values for past rounds are dropped. A neighbor that stays silent past the
//! round timeout contributes this node's own value for that round.

use adac_common::Matrix;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use super::{ConsensusEngine, Weights};
use crate::network::{Channel, TransportError};

/// Largest UDP payload over IPv4
pub const MAX_DATAGRAM: usize = 65_507;

#[derive(Debug, Serialize, Deserialize)]
struct RoundMessage {
    tag: u32,
    round: u32,
    origin: String,
    values: Matrix,
}

#[derive(Debug, Clone)]
pub struct AverageConsensus {
    round_timeout: Duration,
}

impl AverageConsensus {
    pub fn new(round_timeout: Duration) -> Self {
        Self { round_timeout }
    }

    /// Host and port for a neighbor; a bare address uses this node's port
    fn endpoint(address: &str, default_port: u16) -> (String, u16) {
        match address.parse::<SocketAddr>() {
            Ok(sa) => (sa.ip().to_string(), sa.port()),
            Err(_) => (address.to_string(), default_port),
        }
    }

    async fn broadcast(
        &self,
        channel: &dyn Channel,
        weights: &Weights,
        payload: &[u8],
    ) {
        for neighbor in &weights.neighbors {
            let (host, port) = Self::endpoint(&neighbor.address, channel.port());
            if let Err(e) = channel.send_to(&host, port, payload).await {
                warn!("Send to {}:{} failed: {}", host, port, e);
            }
        }
    }

    /// Receive until every neighbor's value for `round` is buffered or the
    /// round times out
    async fn collect(
        &self,
        channel: &dyn Channel,
        weights: &Weights,
        tag: u32,
        round: u32,
        iterations: u32,
        shape: (usize, usize),
        pending: &mut HashMap<u32, HashMap<String, Matrix>>,
    ) -> Result<()> {
        let deadline = Instant::now() + self.round_timeout;
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            let have = pending.get(&round).map_or(0, HashMap::len);
            if have >= weights.neighbors.len() {
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }

            let (len, from) = match timeout(remaining, channel.recv_from(&mut buf)).await {
                Err(_) => return Ok(()),
                Ok(Ok(received)) => received,
                Ok(Err(TransportError::Io(e)))
                    if matches!(e.kind(), ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset) =>
                {
                    debug!("Ignoring ICMP error on receive: {}", e);
                    continue;
                }
                Ok(Err(e)) => return Err(e).context("Receive on consensus channel failed"),
            };

            let msg: RoundMessage = match serde_json::from_slice(&buf[..len]) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("Dropping undecodable datagram from {}: {}", from, e);
                    continue;
                }
            };

            if msg.tag != tag || msg.round < round || msg.round >= iterations {
                debug!(
                    "Dropping out-of-window datagram from {} (tag {}, round {})",
                    msg.origin, msg.tag, msg.round
                );
                continue;
            }
            if !weights.neighbors.iter().any(|n| n.address == msg.origin) {
                debug!("Dropping datagram from non-neighbor {}", msg.origin);
                continue;
            }
            if msg.values.shape() != shape {
                warn!(
                    "Dropping value from {} with shape {:?}, expected {:?}",
                    msg.origin,
                    msg.values.shape(),
                    shape
                );
                continue;
            }

            pending
                .entry(msg.round)
                .or_default()
                .insert(msg.origin, msg.values);
        }
    }
}

#[async_trait]
impl ConsensusEngine for AverageConsensus {
    async fn run(
        &self,
        data: Matrix,
        iterations: u32,
        tag: u32,
        weights: &Weights,
        channel: &mut dyn Channel,
    ) -> Result<Matrix> {
        let channel: &dyn Channel = channel;
        let shape = data.shape();
        let mut current = data;
        let mut pending: HashMap<u32, HashMap<String, Matrix>> = HashMap::new();

        for round in 0..iterations {
            let payload = serde_json::to_vec(&RoundMessage {
                tag,
                round,
                origin: weights.node.clone(),
                values: current.clone(),
            })
            .context("Failed to encode round message")?;

            if payload.len() > MAX_DATAGRAM {
                bail!(
                    "Round message is {} bytes, larger than a UDP datagram",
                    payload.len()
                );
            }

            self.broadcast(channel, weights, &payload).await;
            self.collect(channel, weights, tag, round, iterations, shape, &mut pending)
                .await?;

            let received = pending.remove(&round).unwrap_or_default();
            let mut next = Matrix::zeros_like(&current);
            next.add_scaled(weights.self_weight, &current)?;

            let mut missing = 0;
            for neighbor in &weights.neighbors {
                match received.get(&neighbor.address) {
                    Some(values) => next.add_scaled(neighbor.weight, values)?,
                    None => {
                        missing += 1;
                        next.add_scaled(neighbor.weight, &current)?;
                    }
                }
            }
            if missing > 0 {
                warn!(
                    "Round {}: {} of {} neighbors silent, using own value",
                    round,
                    missing,
                    weights.neighbors.len()
                );
            }

            debug!("Finished consensus round {}/{}", round + 1, iterations);
            current = next;
        }

        Ok(current)
    }
}
