//! Best-effort start propagation to graph neighbors.
//!
//! Every neighbor receives exactly one `GET /start/consensus?tc=N` request.
//! Requests run concurrently with a bounded timeout; a failing neighbor is
//! logged and skipped, never retried, and never aborts the caller's job.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Request result classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Success,
    NetworkError,
    Timeout,
    Http4xx,
    Http5xx,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NetworkError => "network_error",
            Self::Timeout => "timeout",
            Self::Http4xx => "http_4xx",
            Self::Http5xx => "http_5xx",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A start request that did not reach its neighbor
#[derive(Debug, Clone, thiserror::Error)]
#[error("{status}: {detail}")]
pub struct NotifyError {
    pub status: RequestStatus,
    pub detail: String,
}

/// Sends one start request to one URL
#[async_trait]
pub trait StartClient: Send + Sync {
    async fn start(&self, url: &str) -> Result<(), NotifyError>;
}

/// reqwest-backed start client
#[derive(Clone)]
pub struct HttpStartClient {
    client: reqwest::Client,
}

impl HttpStartClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    fn classify_error(err: &reqwest::Error) -> RequestStatus {
        if err.is_timeout() {
            RequestStatus::Timeout
        } else if let Some(status) = err.status() {
            if status.is_client_error() {
                RequestStatus::Http4xx
            } else if status.is_server_error() {
                RequestStatus::Http5xx
            } else {
                RequestStatus::NetworkError
            }
        } else {
            RequestStatus::NetworkError
        }
    }
}

#[async_trait]
impl StartClient for HttpStartClient {
    async fn start(&self, url: &str) -> Result<(), NotifyError> {
        let response = self.client.get(url).send().await.map_err(|e| NotifyError {
            status: Self::classify_error(&e),
            detail: e.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("{} answered: {}", url, body.trim());
            return Ok(());
        }

        Err(NotifyError {
            status: if status.is_client_error() {
                RequestStatus::Http4xx
            } else if status.is_server_error() {
                RequestStatus::Http5xx
            } else {
                RequestStatus::NetworkError
            },
            detail: format!("HTTP {}", status),
        })
    }
}

/// Outcome of one fan-out, for logging and tests
#[derive(Debug, Default, Clone)]
pub struct FanoutReport {
    pub attempted: usize,
    pub delivered: Vec<String>,
    pub failed: Vec<(String, NotifyError)>,
}

impl FanoutReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty() && self.delivered.len() == self.attempted
    }
}

/// Broadcasts the start signal to a neighbor list
#[derive(Clone)]
pub struct FanoutNotifier {
    client: Arc<dyn StartClient>,
}

impl FanoutNotifier {
    pub fn new(client: Arc<dyn StartClient>) -> Self {
        Self { client }
    }

    pub fn start_url(address: &str, control_port: u16, iterations: u32) -> String {
        format!(
            "http://{}:{}/start/consensus?tc={}",
            address, control_port, iterations
        )
    }

    /// Ask every neighbor to start its own consensus job. Never fails.
    pub async fn notify_all(
        &self,
        neighbors: &[String],
        iterations: u32,
        control_port: u16,
    ) -> FanoutReport {
        let mut report = FanoutReport {
            attempted: neighbors.len(),
            ..Default::default()
        };
        if neighbors.is_empty() {
            debug!("No neighbors to notify");
            return report;
        }

        info!("Notifying {} neighbors to start consensus", neighbors.len());

        let mut join_set = JoinSet::new();
        for address in neighbors {
            let address = address.clone();
            let client = Arc::clone(&self.client);
            let url = Self::start_url(&address, control_port, iterations);

            join_set.spawn(async move {
                debug!("Kickoff URL for node {} is {}", address, url);
                let result = client.start(&url).await;
                (address, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((address, Ok(()))) => {
                    debug!("Neighbor {} notified", address);
                    report.delivered.push(address);
                }
                Ok((address, Err(e))) => {
                    warn!("Could not reach neighbor {}: {}", address, e);
                    report.failed.push((address, e));
                }
                Err(e) => {
                    error!("Fan-out task aborted: {}", e);
                }
            }
        }

        info!(
            "Fan-out finished: {}/{} neighbors reached",
            report.delivered.len(),
            report.attempted
        );
        report
    }
}
