//! Node-to-node communication: HTTP start fan-out and the UDP job channel.

pub mod fanout;
pub mod transport;

pub use fanout::{FanoutNotifier, FanoutReport, HttpStartClient, NotifyError, RequestStatus, StartClient};
pub use transport::{Channel, Transport, TransportError, UdpChannel, UdpTransport};
