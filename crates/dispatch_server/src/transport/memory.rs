use super::{Endpoint, Transport};
use crate::error::TransportError;
use async_trait::async_trait;
use disgate_protocol::DEFAULT_MTU;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Peer {
    connected: bool,
    inbox: VecDeque<Vec<u8>>,
}

#[derive(Debug, Default)]
struct NetworkState {
    peers: Vec<Peer>,
    /// Every datagram sent, with the index of its sender
    history: Vec<(usize, Vec<u8>)>,
}

/// A broadcast segment shared by in-process transports.
///
/// Every datagram a connected peer sends is queued for every other
/// connected peer. Used to run dispatch components against each other
/// without sockets.
#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport attached to this segment.
    pub fn transport(&self) -> MemoryTransport {
        let peer = {
            let mut state = self.lock();
            state.peers.push(Peer::default());
            state.peers.len() - 1
        };
        MemoryTransport { network: self.clone(), peer, mtu: DEFAULT_MTU, refuse_connect: false }
    }

    /// Delivers `datagram` to every connected peer as if sent by an
    /// outside simulator.
    pub fn inject(&self, datagram: &[u8]) {
        let mut state = self.lock();
        for peer in state.peers.iter_mut().filter(|p| p.connected) {
            peer.inbox.push_back(datagram.to_vec());
        }
    }

    /// Datagrams sent by any transport on this segment, oldest first.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock().history.iter().map(|(_, d)| d.clone()).collect()
    }

    pub fn sent_bytes(&self) -> usize {
        self.lock().history.iter().map(|(_, d)| d.len()).sum()
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One peer on a [`MemoryNetwork`].
#[derive(Debug)]
pub struct MemoryTransport {
    network: MemoryNetwork,
    peer: usize,
    mtu: usize,
    refuse_connect: bool,
}

impl MemoryTransport {
    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Makes every `connect` fail, for exercising attach failures.
    pub fn refusing(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// Datagrams waiting to be received.
    pub fn pending(&self) -> usize {
        self.network.lock().peers[self.peer].inbox.len()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError> {
        if self.refuse_connect {
            return Err(TransportError::Refused(endpoint.target().to_string()));
        }
        self.network.lock().peers[self.peer].connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let mut state = self.network.lock();
        let peer = &mut state.peers[self.peer];
        peer.connected = false;
        peer.inbox.clear();
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        let mut state = self.network.lock();
        if !state.peers[self.peer].connected {
            return Err(TransportError::NotConnected);
        }

        let sender = self.peer;
        for (index, peer) in state.peers.iter_mut().enumerate() {
            if index != sender && peer.connected {
                peer.inbox.push_back(bytes.to_vec());
            }
        }
        state.history.push((sender, bytes.to_vec()));
        Ok(bytes.len())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let mut state = self.network.lock();
        let peer = &mut state.peers[self.peer];
        if !peer.connected {
            return Err(TransportError::NotConnected);
        }

        let Some(datagram) = peer.inbox.pop_front() else {
            return Ok(0);
        };
        // like UDP, a datagram longer than the buffer is truncated
        let len = datagram.len().min(buf.len());
        buf[..len].copy_from_slice(&datagram[..len]);
        Ok(len)
    }

    fn mtu(&self) -> usize {
        self.mtu
    }

    fn is_connected(&self) -> bool {
        self.network.lock().peers[self.peer].connected
    }
}
