use super::outbound::{FlushPlan, MtuPolicy, OutboundBuffer};
use super::registry::{AdaptorId, AdaptorRegistry};
use super::session::NetworkSession;
use super::{OutgoingAdaptor, OutgoingContext};
use crate::events::{ActorEvent, LocalMessageType};
use crate::simulation::SimulationHandle;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outbound dispatcher: local actor events in, encoded PDUs queued.
#[derive(Debug, Default)]
pub struct OutgoingMessage {
    adaptors: AdaptorRegistry<LocalMessageType, dyn OutgoingAdaptor>,
    buffer: OutboundBuffer,
}

impl OutgoingMessage {
    pub fn new(mtu: usize) -> Self {
        Self { adaptors: AdaptorRegistry::new(), buffer: OutboundBuffer::new(mtu) }
    }

    /// Registers `adaptor` for events of kind `tag`. Returns `false` if an
    /// adaptor with the same id is already registered there.
    pub fn add_adaptor(&mut self, tag: LocalMessageType, adaptor: Arc<dyn OutgoingAdaptor>) -> bool {
        let id = adaptor.id();
        self.adaptors.add(tag, id, adaptor)
    }

    pub fn remove_adaptor(&mut self, tag: LocalMessageType, id: &AdaptorId) -> bool {
        self.adaptors.remove(tag, id)
    }

    pub fn adaptor_count(&self) -> usize {
        self.adaptors.len()
    }

    pub fn clear_adaptors(&mut self) {
        self.adaptors.clear();
    }

    /// Snapshot of what is registered, for [`retain_adaptors`](Self::retain_adaptors).
    pub fn registrations(&self) -> Vec<(LocalMessageType, AdaptorId)> {
        self.adaptors.registrations()
    }

    /// Unregisters every adaptor missing from `keep`. Returns how many went.
    pub fn retain_adaptors(&mut self, keep: &[(LocalMessageType, AdaptorId)]) -> usize {
        self.adaptors.retain_registrations(keep)
    }

    /// Converts one local event and queues the resulting PDUs.
    ///
    /// Events about actors this side does not own are ignored: anything that
    /// came from the network, anything the simulation marks remote and
    /// anything the session created from network traffic. Returns the number
    /// of PDUs queued.
    pub fn handle(&mut self, event: &ActorEvent, session: &mut NetworkSession, simulation: &dyn SimulationHandle) -> usize {
        if event.is_from_network() || session.is_remote(&event.actor_id) {
            return 0;
        }
        if simulation.find_actor(&event.actor_id).is_some_and(|actor| actor.is_remote) {
            debug!("Not publishing remote actor {}", event.actor_id);
            return 0;
        }

        let order = session.byte_order();
        let mut queued = 0;
        for adaptor in self.adaptors.adaptors_for(event.kind) {
            let mut ctx = OutgoingContext { session: &mut *session, simulation };
            let Some(pdu) = adaptor.convert(event, &mut ctx) else {
                continue;
            };
            match pdu.encode(order) {
                Ok(bytes) => {
                    self.buffer.push(bytes);
                    queued += 1;
                }
                Err(e) => warn!("⚠️ Adaptor '{}' produced an unencodable {}: {}", adaptor.id(), pdu.pdu_type(), e),
            }
        }
        queued
    }

    pub fn buffer(&self) -> &OutboundBuffer {
        &self.buffer
    }

    /// Discards every queued PDU.
    pub fn clear_data(&mut self) {
        self.buffer.clear();
    }

    /// Drains queued PDUs into datagrams.
    pub fn take_datagrams(&mut self, policy: MtuPolicy) -> FlushPlan {
        self.buffer.flush(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ActorSnapshot, EntityState, EventSource};
    use crate::message::DisSettings;
    use crate::pdu::{EntityManagementPdu, Pdu};
    use crate::simulation::ActorRegistry;
    use crate::types::{ActorId, ActorType, EntityIdentifier};

    struct Announce;

    impl OutgoingAdaptor for Announce {
        fn id(&self) -> AdaptorId {
            "announce".into()
        }

        fn convert(&self, _event: &ActorEvent, ctx: &mut OutgoingContext<'_>) -> Option<Pdu> {
            let request = ctx.session.next_request_id();
            Some(Pdu::CreateEntity(EntityManagementPdu::create(6, 1, EntityIdentifier::new(1, 1, 1), request)))
        }
    }

    fn snapshot(is_remote: bool) -> ActorSnapshot {
        ActorSnapshot {
            id: ActorId::new(),
            name: "a".to_string(),
            actor_type: ActorType::new("vehicles", "tank"),
            is_remote,
            state: EntityState::default(),
        }
    }

    #[test]
    fn test_handle_queues_one_pdu_per_adaptor() {
        let mut outgoing = OutgoingMessage::new(1500);
        assert!(outgoing.add_adaptor(LocalMessageType::ActorCreated, Arc::new(Announce)));
        assert!(!outgoing.add_adaptor(LocalMessageType::ActorCreated, Arc::new(Announce)));

        let mut session = NetworkSession::new(DisSettings::default());
        let sim = ActorRegistry::new();

        let event = ActorEvent::created(snapshot(false), EventSource::Local);
        assert_eq!(outgoing.handle(&event, &mut session, &sim), 1);
        assert_eq!(outgoing.buffer().len(), 1);
        assert_eq!(outgoing.buffer().byte_len(), EntityManagementPdu::ENCODED_LEN);

        // no adaptor for updates
        let update = ActorEvent::updated(snapshot(false), EventSource::Local);
        assert_eq!(outgoing.handle(&update, &mut session, &sim), 0);

        outgoing.clear_data();
        assert!(outgoing.buffer().is_empty());
    }

    #[test]
    fn test_handle_skips_actors_owned_elsewhere() {
        let mut outgoing = OutgoingMessage::new(1500);
        outgoing.add_adaptor(LocalMessageType::ActorCreated, Arc::new(Announce));
        let mut session = NetworkSession::new(DisSettings::default());
        let mut sim = ActorRegistry::new();

        let from_wire = ActorEvent::created(snapshot(false), EventSource::Network);
        assert_eq!(outgoing.handle(&from_wire, &mut session, &sim), 0);

        let ghost = snapshot(true);
        sim.send_message(ActorEvent::created(ghost.clone(), EventSource::Network));
        let echoed = ActorEvent::created(ghost, EventSource::Local);
        assert_eq!(outgoing.handle(&echoed, &mut session, &sim), 0);

        let mirrored = snapshot(false);
        session.mark_remote(mirrored.id);
        assert_eq!(outgoing.handle(&ActorEvent::created(mirrored, EventSource::Local), &mut session, &sim), 0);

        assert!(outgoing.buffer().is_empty());
    }
}
