//! Fakes shared by the integration tests.
//!
//! Every fake appends to one event log so tests can check ordering across
//! fan-out, engine and channel teardown.

#![allow(dead_code)]

use adac_common::{Matrix, NodeConfig};
use adacd::consensus::{ConsensusEngine, Weights};
use adacd::network::{Channel, NotifyError, RequestStatus, StartClient, Transport, TransportError};
use adacd::{JobStateGuard, NodeContext};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub const SELF_ADDRESS: &str = "10.0.0.2";

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn push(log: &EventLog, event: impl Into<String>) {
    log.lock().unwrap().push(event.into());
}

/// Three-node path graph with this node in the middle
pub fn fixture_config(dir: &Path) -> NodeConfig {
    let data = dir.join("data.txt");
    std::fs::write(&data, "1 2 3\n4 5 6\n").unwrap();

    NodeConfig::from_toml_str(&format!(
        r#"
[graph]
nodes = ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
edges = [[1, 1, 0], [1, 1, 1], [0, 1, 1]]

[consensus]
udp_port = 9999

[node_runner]
port = 9090
self_address = "{}"

[data]
file = "{}"
"#,
        SELF_ADDRESS,
        data.display()
    ))
    .unwrap()
}

// ============================================================================
// Fake collaborators
// ============================================================================

pub struct RecordingStartClient {
    log: EventLog,
    failing: Vec<String>,
}

impl RecordingStartClient {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            failing: Vec::new(),
        }
    }

    pub fn failing(log: EventLog, failing: &[&str]) -> Self {
        Self {
            log,
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl StartClient for RecordingStartClient {
    async fn start(&self, url: &str) -> Result<(), NotifyError> {
        push(&self.log, format!("notify {}", url));
        if self.failing.iter().any(|f| url.contains(&format!("//{}:", f))) {
            return Err(NotifyError {
                status: RequestStatus::Timeout,
                detail: "timed out".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Healthy,
    FailOpen,
    FailListen,
    /// Listen fails and so does the cleanup close
    FailListenAndClose,
}

/// Transport whose channels report whether the job guard was still held
/// when they were closed
pub struct FakeTransport {
    log: EventLog,
    guard: JobStateGuard,
    mode: TransportMode,
}

impl FakeTransport {
    pub fn new(log: EventLog, guard: JobStateGuard, mode: TransportMode) -> Self {
        Self { log, guard, mode }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(&self, port: u16) -> Result<Box<dyn Channel>, TransportError> {
        if self.mode == TransportMode::FailOpen {
            push(&self.log, "open failed");
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                "port busy",
            )));
        }
        push(&self.log, format!("open {}", port));
        Ok(Box::new(FakeChannel {
            log: self.log.clone(),
            guard: self.guard.clone(),
            port,
            fail_listen: matches!(
                self.mode,
                TransportMode::FailListen | TransportMode::FailListenAndClose
            ),
            fail_close: self.mode == TransportMode::FailListenAndClose,
        }))
    }
}

pub struct FakeChannel {
    log: EventLog,
    guard: JobStateGuard,
    port: u16,
    fail_listen: bool,
    fail_close: bool,
}

#[async_trait]
impl Channel for FakeChannel {
    async fn listen(&mut self) -> Result<(), TransportError> {
        if self.fail_listen {
            push(&self.log, "listen failed");
            return Err(TransportError::Bind {
                port: self.port,
                source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "port busy"),
            });
        }
        push(&self.log, "listen");
        Ok(())
    }

    fn port(&self) -> u16 {
        self.port
    }

    async fn send_to(&self, _host: &str, _port: u16, _payload: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    async fn recv_from(&self, _buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        push(
            &self.log,
            format!("close running={}", self.guard.is_running()),
        );
        if self.fail_close {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "socket already gone",
            )));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub enum EngineMode {
    Succeed,
    Fail,
    /// Hold the job open until notified
    Block(Arc<Notify>),
}

pub struct FakeEngine {
    log: EventLog,
    mode: EngineMode,
}

impl FakeEngine {
    pub fn new(log: EventLog, mode: EngineMode) -> Self {
        Self { log, mode }
    }
}

#[async_trait]
impl ConsensusEngine for FakeEngine {
    async fn run(
        &self,
        data: Matrix,
        iterations: u32,
        tag: u32,
        weights: &Weights,
        _channel: &mut dyn Channel,
    ) -> Result<Matrix> {
        push(
            &self.log,
            format!(
                "engine iterations={} tag={} neighbors={}",
                iterations,
                tag,
                weights.neighbors.len()
            ),
        );
        match &self.mode {
            EngineMode::Succeed => Ok(data),
            EngineMode::Fail => bail!("matrix is singular"),
            EngineMode::Block(release) => {
                release.notified().await;
                Ok(data)
            }
        }
    }
}

/// Node wired with fakes; returns the node and its event log
pub fn fake_node(dir: &Path, engine: EngineMode, transport: TransportMode) -> (NodeContext, EventLog) {
    let log = new_log();
    let config = fixture_config(dir);
    let node = NodeContext::from_config(&config, SELF_ADDRESS.to_string()).unwrap();
    let guard = node.guard.clone();

    let node = node
        .with_start_client(Arc::new(RecordingStartClient::new(log.clone())))
        .with_transport(Arc::new(FakeTransport::new(log.clone(), guard, transport)))
        .with_engine(Arc::new(FakeEngine::new(log.clone(), engine)));

    (node, log)
}

/// Poll until the guard is idle
pub async fn wait_until_idle(guard: &JobStateGuard) {
    for _ in 0..500 {
        if !guard.is_running() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job never released the guard");
}
