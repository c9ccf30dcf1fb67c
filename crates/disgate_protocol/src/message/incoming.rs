use super::registry::{AdaptorId, AdaptorRegistry};
use super::session::NetworkSession;
use super::IncomingAdaptor;
use crate::events::ActorEvent;
use crate::pdu::{CodecError, Pdu, PduType};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where and why decoding of a datagram stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Byte offset of the PDU that failed to decode
    pub offset: usize,
    pub error: CodecError,
}

/// Everything one datagram produced.
#[derive(Debug, Default)]
pub struct ProcessOutcome {
    pub events: Vec<ActorEvent>,
    /// PDUs decoded successfully, handled or not
    pub decoded: usize,
    /// Decoded PDUs that no adaptor handled or that belong to another exercise
    pub skipped: usize,
    pub parse_error: Option<ParseFailure>,
}

/// Inbound dispatcher: datagrams in, actor events out.
#[derive(Debug, Default)]
pub struct IncomingMessage {
    adaptors: AdaptorRegistry<PduType, dyn IncomingAdaptor>,
}

impl IncomingMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_adaptor(&mut self, tag: PduType, adaptor: Arc<dyn IncomingAdaptor>) -> bool {
        let id = adaptor.id();
        self.adaptors.add(tag, id, adaptor)
    }

    pub fn remove_adaptor(&mut self, tag: PduType, id: &AdaptorId) -> bool {
        self.adaptors.remove(tag, id)
    }

    pub fn adaptor_count(&self) -> usize {
        self.adaptors.len()
    }

    pub fn clear_adaptors(&mut self) {
        self.adaptors.clear();
    }

    /// Snapshot of what is registered, for [`retain_adaptors`](Self::retain_adaptors).
    pub fn registrations(&self) -> Vec<(PduType, AdaptorId)> {
        self.adaptors.registrations()
    }

    /// Unregisters every adaptor missing from `keep`. Returns how many went.
    pub fn retain_adaptors(&mut self, keep: &[(PduType, AdaptorId)]) -> usize {
        self.adaptors.retain_registrations(keep)
    }

    /// Decodes every PDU packed into `datagram` and collects the events the
    /// registered adaptors produce.
    ///
    /// Decoding stops at the first malformed PDU; whatever was produced
    /// before it is kept.
    pub fn process(&self, datagram: &[u8], session: &mut NetworkSession) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();
        let order = session.byte_order();
        let exercise_id = session.settings().exercise_id;
        let mut offset = 0;

        while offset < datagram.len() {
            let (pdu, used) = match Pdu::decode(&datagram[offset..], order) {
                Ok(decoded) => decoded,
                Err(error) => {
                    warn!(
                        "⚠️ Malformed PDU at offset {} of {} byte datagram, discarding remainder: {}",
                        offset,
                        datagram.len(),
                        error
                    );
                    outcome.parse_error = Some(ParseFailure { offset, error });
                    break;
                }
            };
            offset += used;
            outcome.decoded += 1;

            let header = pdu.header();
            if header.exercise_id != exercise_id {
                debug!("Skipping {} for exercise {} (joined {})", header.pdu_type, header.exercise_id, exercise_id);
                outcome.skipped += 1;
                continue;
            }

            let adaptors = self.adaptors.adaptors_for(header.pdu_type);
            if adaptors.is_empty() {
                debug!("No adaptor registered for {}, skipping", header.pdu_type);
                outcome.skipped += 1;
                continue;
            }

            for adaptor in adaptors {
                outcome.events.extend(adaptor.convert(&pdu, session));
            }
        }

        outcome
    }
}
