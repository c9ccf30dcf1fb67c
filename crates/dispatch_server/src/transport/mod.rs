//! # Network Transport
//!
//! Datagram I/O behind the [`Transport`] trait. Connecting and
//! disconnecting are async lifecycle steps; sending and receiving never
//! block, so the dispatch tick polls the socket at most once per call.
//!
//! - [`UdpTransport`]: UDP unicast, broadcast or multicast over tokio
//! - [`MemoryTransport`]: in-process peers sharing a [`MemoryNetwork`]

mod memory;
mod udp;

pub use memory::{MemoryNetwork, MemoryTransport};
pub use udp::UdpTransport;

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// DIS traffic conventionally uses UDP port 3000.
pub const DEFAULT_DIS_PORT: u16 = 3000;

pub use disgate_protocol::MAX_DATAGRAM;

/// Address and socket options of an exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Destination of outgoing datagrams: a unicast, broadcast or multicast address
    pub address: IpAddr,

    pub port: u16,

    /// Local interface to bind and to join multicast groups on
    pub interface: Ipv4Addr,

    /// Receive our own multicast traffic
    pub multicast_loopback: bool,
}

impl Endpoint {
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self { address, port, ..Default::default() }
    }

    pub fn target(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    pub fn is_multicast(&self) -> bool {
        self.address.is_multicast()
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::BROADCAST),
            port: DEFAULT_DIS_PORT,
            interface: Ipv4Addr::UNSPECIFIED,
            multicast_loopback: false,
        }
    }
}

#[async_trait]
pub trait Transport: Send {
    /// Opens the socket. Failure leaves the transport disconnected.
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError>;

    /// Closes the socket. Disconnecting twice is not an error.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Sends one datagram without blocking.
    fn send(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    /// Reads one pending datagram into `buf` without blocking.
    /// Returns 0 when nothing is waiting.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn mtu(&self) -> usize;

    fn is_connected(&self) -> bool;
}
