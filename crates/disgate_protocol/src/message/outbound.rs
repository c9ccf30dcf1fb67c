use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::warn;

pub const DEFAULT_MTU: usize = 1500;

/// Largest payload a single UDP datagram can carry. No policy builds a
/// datagram above it.
pub const MAX_DATAGRAM: usize = 65_507;

/// What to do when pending traffic does not fit one MTU-sized datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MtuPolicy {
    /// Send everything as one datagram and warn when it exceeds the MTU.
    /// This is the historical behavior. Traffic beyond [`MAX_DATAGRAM`] is
    /// still split on PDU boundaries.
    #[default]
    SendAnyway,
    /// Send one datagram of whole PDUs up to the MTU; keep the rest for the
    /// next flush.
    Reject,
    /// Send as many MTU-bounded datagrams of whole PDUs as needed.
    Fragment,
}

/// Result of draining the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushPlan {
    pub datagrams: Vec<Vec<u8>>,
    /// Sizes of PDUs discarded because a single one exceeds the MTU
    pub dropped: Vec<usize>,
    /// PDUs still waiting for a later flush
    pub deferred: usize,
}

impl FlushPlan {
    pub fn total_bytes(&self) -> usize {
        self.datagrams.iter().map(Vec::len).sum()
    }
}

/// Encoded PDUs waiting to be sent, in submission order.
#[derive(Debug)]
pub struct OutboundBuffer {
    mtu: usize,
    pending: VecDeque<Vec<u8>>,
    bytes: usize,
}

impl Default for OutboundBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MTU)
    }
}

impl OutboundBuffer {
    pub fn new(mtu: usize) -> Self {
        Self { mtu, pending: VecDeque::new(), bytes: 0 }
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn set_mtu(&mut self, mtu: usize) {
        self.mtu = mtu;
    }

    pub fn push(&mut self, pdu: Vec<u8>) {
        self.bytes += pdu.len();
        self.pending.push_back(pdu);
    }

    /// Number of pending PDUs.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.bytes = 0;
    }

    /// Drains pending PDUs into datagrams according to `policy`.
    ///
    /// An empty buffer always yields an empty plan.
    pub fn flush(&mut self, policy: MtuPolicy) -> FlushPlan {
        let mut plan = FlushPlan::default();
        if self.pending.is_empty() {
            return plan;
        }

        match policy {
            MtuPolicy::SendAnyway => {
                while let Some(datagram) = self.fill_datagram(MAX_DATAGRAM, &mut plan.dropped) {
                    if datagram.len() > self.mtu {
                        warn!("⚠️ Outbound datagram of {} bytes exceeds MTU of {} bytes, sending anyway", datagram.len(), self.mtu);
                    }
                    plan.datagrams.push(datagram);
                }
            }
            MtuPolicy::Reject => {
                if let Some(datagram) = self.fill_datagram(self.mtu, &mut plan.dropped) {
                    plan.datagrams.push(datagram);
                }
            }
            MtuPolicy::Fragment => {
                while let Some(datagram) = self.fill_datagram(self.mtu, &mut plan.dropped) {
                    plan.datagrams.push(datagram);
                }
            }
        }

        plan.deferred = self.pending.len();
        plan
    }

    /// Packs whole PDUs from the front of the queue into one datagram of at
    /// most `limit` bytes. PDUs that could never fit are dropped on the way.
    fn fill_datagram(&mut self, limit: usize, dropped: &mut Vec<usize>) -> Option<Vec<u8>> {
        let mut datagram = Vec::new();

        while let Some(front) = self.pending.front() {
            let len = front.len();
            if len > limit {
                warn!("⚠️ Dropping {} byte PDU that exceeds the {} byte datagram limit", len, limit);
                self.pending.pop_front();
                self.bytes -= len;
                dropped.push(len);
                continue;
            }
            if datagram.len() + len > limit {
                break;
            }
            if let Some(pdu) = self.pending.pop_front() {
                self.bytes -= len;
                datagram.extend_from_slice(&pdu);
            }
        }

        (!datagram.is_empty()).then_some(datagram)
    }
}
