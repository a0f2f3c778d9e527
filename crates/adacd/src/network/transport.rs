//! UDP transport channel used by a consensus job.
//!
//! A channel is opened per job, listens on the configured UDP port for the
//! duration of the job and is closed by the worker before the job guard is
//! released.

use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Channel is not listening")]
    NotListening,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opens channels
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, port: u16) -> Result<Box<dyn Channel>, TransportError>;
}

/// A datagram channel owned by one job
#[async_trait]
pub trait Channel: Send + Sync {
    /// Start accepting datagrams
    async fn listen(&mut self) -> Result<(), TransportError>;

    /// Local port, meaningful once listening
    fn port(&self) -> u16;

    async fn send_to(&self, host: &str, port: u16, payload: &[u8]) -> Result<(), TransportError>;

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError>;

    /// Release the underlying socket
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// UDP transport bound on all interfaces
#[derive(Debug, Clone)]
pub struct UdpTransport {
    bind_host: String,
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new("0.0.0.0")
    }
}

impl UdpTransport {
    pub fn new(bind_host: impl Into<String>) -> Self {
        Self {
            bind_host: bind_host.into(),
        }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn open(&self, port: u16) -> Result<Box<dyn Channel>, TransportError> {
        debug!("Opening UDP channel on {}:{}", self.bind_host, port);
        Ok(Box::new(UdpChannel {
            bind_host: self.bind_host.clone(),
            port,
            socket: None,
        }))
    }
}

#[derive(Debug)]
pub struct UdpChannel {
    bind_host: String,
    port: u16,
    socket: Option<UdpSocket>,
}

impl UdpChannel {
    fn socket(&self) -> Result<&UdpSocket, TransportError> {
        self.socket.as_ref().ok_or(TransportError::NotListening)
    }
}

#[async_trait]
impl Channel for UdpChannel {
    async fn listen(&mut self) -> Result<(), TransportError> {
        let socket = UdpSocket::bind((self.bind_host.as_str(), self.port))
            .await
            .map_err(|source| TransportError::Bind {
                port: self.port,
                source,
            })?;
        self.port = socket.local_addr()?.port();
        debug!("Now listening on UDP port {}", self.port);
        self.socket = Some(socket);
        Ok(())
    }

    fn port(&self) -> u16 {
        self.port
    }

    async fn send_to(&self, host: &str, port: u16, payload: &[u8]) -> Result<(), TransportError> {
        self.socket()?.send_to(payload, (host, port)).await?;
        Ok(())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), TransportError> {
        Ok(self.socket()?.recv_from(buf).await?)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.socket.take().is_some() {
            debug!("Closed UDP channel on port {}", self.port);
        }
        Ok(())
    }
}
