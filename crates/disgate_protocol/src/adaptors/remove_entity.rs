//! Remove Entity adaptors in both directions.

use crate::events::{ActorEvent, EventSource};
use crate::message::{AdaptorId, IncomingAdaptor, NetworkSession, OutgoingAdaptor, OutgoingContext};
use crate::pdu::{EntityManagementPdu, Pdu};
use tracing::{debug, info};

/// Announces deleted local actors with a Remove Entity PDU and forgets
/// their network identity.
#[derive(Debug, Default)]
pub struct RemoveEntityOutgoingAdaptor;

impl RemoveEntityOutgoingAdaptor {
    pub const ID: &'static str = "builtin.remove_entity.outgoing";
}

impl OutgoingAdaptor for RemoveEntityOutgoingAdaptor {
    fn id(&self) -> AdaptorId {
        AdaptorId::new(Self::ID)
    }

    fn convert(&self, event: &ActorEvent, ctx: &mut OutgoingContext<'_>) -> Option<Pdu> {
        let session = &mut *ctx.session;
        let Some(entity_id) = session.identity().get_entity_id(&event.actor_id) else {
            info!("Actor {} was never published, nothing to remove", event.actor_id);
            return None;
        };

        let request_id = session.next_request_id();
        let settings = session.settings();
        let pdu = EntityManagementPdu::remove(settings.protocol_version, settings.exercise_id, entity_id, request_id);
        session.release_actor(&event.actor_id);

        info!("🗑️ Retracting entity {} of actor {}", entity_id, event.actor_id);
        Some(Pdu::RemoveEntity(pdu))
    }
}

/// Turns Remove Entity PDUs for known remote entities into deletion events.
///
/// The entity to remove is taken from the receiving id; requests that
/// leave it unset name the entity in the originating id instead.
#[derive(Debug, Default)]
pub struct RemoveEntityIncomingAdaptor;

impl RemoveEntityIncomingAdaptor {
    pub const ID: &'static str = "builtin.remove_entity.incoming";
}

impl IncomingAdaptor for RemoveEntityIncomingAdaptor {
    fn id(&self) -> AdaptorId {
        AdaptorId::new(Self::ID)
    }

    fn convert(&self, pdu: &Pdu, session: &mut NetworkSession) -> Vec<ActorEvent> {
        let Pdu::RemoveEntity(request) = pdu else {
            return Vec::new();
        };

        let identity = session.identity();
        let Some(actor) = identity
            .get_actor_by_entity_id(&request.receiving)
            .or_else(|| identity.get_actor_by_entity_id(&request.originating))
        else {
            debug!("Remove request for unknown entity {}", request.receiving);
            return Vec::new();
        };

        if !session.is_remote(&actor) {
            debug!("Ignoring remove request for locally owned actor {}", actor);
            return Vec::new();
        }

        // the event is built before the binding goes away
        let event = ActorEvent::deleted(actor, EventSource::Network);
        session.release_actor(&actor);
        info!("🗑️ Entity {} removed by its owner", request.receiving);
        vec![event]
    }
}
