use super::{Endpoint, Transport, MAX_DATAGRAM};
use crate::error::TransportError;
use async_trait::async_trait;
use disgate_protocol::{MtuPolicy, DEFAULT_MTU};
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// UDP transport for DIS traffic.
///
/// Broadcast is always enabled on the socket. When the endpoint address is
/// a multicast group the socket binds the wildcard address and joins the
/// group on the configured interface.
#[derive(Debug)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    endpoint: Option<Endpoint>,
    mtu: usize,
    policy: MtuPolicy,
}

impl UdpTransport {
    pub fn new(mtu: usize, policy: MtuPolicy) -> Self {
        Self { socket: None, endpoint: None, mtu, policy }
    }

    /// Address the socket is actually bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn bind_address(endpoint: &Endpoint) -> SocketAddr {
        match endpoint.address {
            IpAddr::V4(group) if group.is_multicast() => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), endpoint.port),
            IpAddr::V4(_) => SocketAddr::new(endpoint.interface.into(), endpoint.port),
            IpAddr::V6(_) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), endpoint.port),
        }
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_MTU, MtuPolicy::default())
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError> {
        if self.socket.is_some() {
            self.disconnect().await?;
        }

        let address = Self::bind_address(endpoint);
        let socket = UdpSocket::bind(address).await.map_err(|source| TransportError::Bind { address, source })?;
        socket.set_broadcast(true)?;

        match endpoint.address {
            IpAddr::V4(group) if group.is_multicast() => {
                socket.join_multicast_v4(group, endpoint.interface)?;
                socket.set_multicast_loop_v4(endpoint.multicast_loopback)?;
                info!("📡 Joined multicast group {} on {}", group, endpoint.interface);
            }
            IpAddr::V6(group) if group.is_multicast() => {
                socket.join_multicast_v6(&group, 0)?;
                socket.set_multicast_loop_v6(endpoint.multicast_loopback)?;
                info!("📡 Joined multicast group {}", group);
            }
            _ => {}
        }

        info!("🌐 UDP transport bound to {} sending to {}", socket.local_addr()?, endpoint.target());
        self.socket = Some(socket);
        self.endpoint = Some(endpoint.clone());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let (Some(socket), Some(endpoint)) = (self.socket.take(), self.endpoint.take()) else {
            return Ok(());
        };

        let left = match endpoint.address {
            IpAddr::V4(group) if group.is_multicast() => socket.leave_multicast_v4(group, endpoint.interface),
            IpAddr::V6(group) if group.is_multicast() => socket.leave_multicast_v6(&group, 0),
            _ => Ok(()),
        };
        if let Err(e) = left {
            warn!("⚠️ Failed to leave multicast group {}: {}", endpoint.address, e);
        }

        info!("🔌 UDP transport closed");
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        let (Some(socket), Some(endpoint)) = (&self.socket, &self.endpoint) else {
            return Err(TransportError::NotConnected);
        };

        if bytes.len() > MAX_DATAGRAM {
            return Err(TransportError::DatagramTooLarge { len: bytes.len(), mtu: self.mtu });
        }
        if bytes.len() > self.mtu {
            match self.policy {
                MtuPolicy::SendAnyway => {
                    warn!("⚠️ Sending {} byte datagram over MTU of {} bytes", bytes.len(), self.mtu);
                }
                MtuPolicy::Reject | MtuPolicy::Fragment => {
                    return Err(TransportError::DatagramTooLarge { len: bytes.len(), mtu: self.mtu });
                }
            }
        }

        Ok(socket.try_send_to(bytes, endpoint.target())?)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let Some(socket) = &self.socket else {
            return Err(TransportError::NotConnected);
        };

        match socket.try_recv_from(buf) {
            Ok((len, from)) => {
                debug!("Received {} bytes from {}", len, from);
                Ok(len)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn mtu(&self) -> usize {
        self.mtu
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn free_port() -> u16 {
        std::net::UdpSocket::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
    }

    fn loopback_endpoint() -> Endpoint {
        Endpoint { interface: Ipv4Addr::LOCALHOST, ..Endpoint::new(Ipv4Addr::LOCALHOST.into(), free_port()) }
    }

    async fn receive_eventually(transport: &mut UdpTransport, buf: &mut [u8]) -> usize {
        for _ in 0..100 {
            let len = transport.receive(buf).unwrap();
            if len > 0 {
                return len;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        0
    }

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let mut transport = UdpTransport::default();
        assert!(matches!(transport.send(&[1, 2, 3]), Err(TransportError::NotConnected)));
        assert!(matches!(transport.receive(&mut [0; 16]), Err(TransportError::NotConnected)));
        // disconnecting an unconnected transport is fine
        transport.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_datagrams_round_trip_over_loopback() {
        let endpoint = loopback_endpoint();
        let mut transport = UdpTransport::default();
        transport.connect(&endpoint).await.unwrap();
        assert!(transport.is_connected());

        let mut buf = [0u8; 64];
        assert_eq!(transport.receive(&mut buf).unwrap(), 0);

        assert_eq!(transport.send(b"entity state").unwrap(), 12);
        let len = receive_eventually(&mut transport, &mut buf).await;
        assert_eq!(&buf[..len], b"entity state");

        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_oversize_datagrams_follow_policy() {
        let endpoint = loopback_endpoint();
        let oversized = vec![0u8; 101];

        let mut hardened = UdpTransport::new(100, MtuPolicy::Reject);
        hardened.connect(&endpoint).await.unwrap();
        assert!(matches!(
            hardened.send(&oversized),
            Err(TransportError::DatagramTooLarge { len: 101, mtu: 100 })
        ));
        assert_eq!(hardened.send(&oversized[..100]).unwrap(), 100);
        hardened.disconnect().await.unwrap();

        let mut legacy = UdpTransport::new(100, MtuPolicy::SendAnyway);
        legacy.connect(&endpoint).await.unwrap();
        assert_eq!(legacy.send(&oversized).unwrap(), 101);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let endpoint = Endpoint { interface: Ipv4Addr::LOCALHOST, ..Endpoint::new(Ipv4Addr::LOCALHOST.into(), port) };

        let mut transport = UdpTransport::default();
        assert!(matches!(transport.connect(&endpoint).await, Err(TransportError::Bind { .. })));
        assert!(!transport.is_connected());
    }
}
