//! Entity State adaptors in both directions.

use super::mappings::ActorTypeMappings;
use crate::events::{ActorEvent, ActorSnapshot, EntityState, EventSource};
use crate::message::{AdaptorId, IncomingAdaptor, NetworkSession, OutgoingAdaptor, OutgoingContext};
use crate::pdu::{EntityStatePdu, Marking, Pdu};
use crate::types::{ActorId, EntityIdentifier, ObjectTypeBinding};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Publishes created and updated local actors as Entity State PDUs.
///
/// The first time an actor is seen it is given an entity identifier, a
/// wire handle and its object name (the actor id) in the session's identity
/// map.
pub struct EntityStateOutgoingAdaptor {
    mappings: Arc<ActorTypeMappings>,
}

impl EntityStateOutgoingAdaptor {
    pub const ID: &'static str = "builtin.entity_state.outgoing";

    pub fn new(mappings: Arc<ActorTypeMappings>) -> Self {
        Self { mappings }
    }

    fn publish(&self, actor: ActorId, binding: &Arc<ObjectTypeBinding>, session: &mut NetworkSession) -> Option<EntityIdentifier> {
        let Some(entity_id) = session.allocate_entity_id() else {
            warn!("⚠️ Entity numbers exhausted, cannot publish actor {}", actor);
            return None;
        };
        let handle = session.allocate_handle();

        let identity = session.identity_mut();
        if !identity.put_entity_id(entity_id, actor) {
            warn!("⚠️ Actor {} already carries another entity id", actor);
            return None;
        }
        identity.put_wire_handle(actor, handle);
        identity.put_type_binding(handle, Arc::clone(binding));
        identity.put_object_name(actor.to_string(), actor);

        info!("📡 Publishing actor {} as entity {} ({})", actor, entity_id, binding.object_class);
        Some(entity_id)
    }
}

impl OutgoingAdaptor for EntityStateOutgoingAdaptor {
    fn id(&self) -> AdaptorId {
        AdaptorId::new(Self::ID)
    }

    fn convert(&self, event: &ActorEvent, ctx: &mut OutgoingContext<'_>) -> Option<Pdu> {
        let snapshot = match &event.snapshot {
            Some(snapshot) => snapshot.clone(),
            None => ctx.simulation.find_actor(&event.actor_id)?,
        };

        let Some(binding) = self.mappings.for_actor_type(&snapshot.actor_type) else {
            info!("Actor type {} has no object mapping, not publishing {}", snapshot.actor_type, snapshot.id);
            return None;
        };

        let entity_id = match ctx.session.identity().get_entity_id(&snapshot.id) {
            Some(entity_id) => entity_id,
            None => self.publish(snapshot.id, &binding, ctx.session)?,
        };

        let settings = ctx.session.settings();
        let entity_type = binding.entity_type.or(snapshot.state.entity_type).unwrap_or_default();
        let mut pdu = EntityStatePdu::new(settings.protocol_version, settings.exercise_id, entity_id, entity_type);

        let state = &snapshot.state;
        pdu.force_id = state.force_id;
        pdu.linear_velocity = state.velocity;
        pdu.location = state.location;
        pdu.orientation = state.orientation;
        pdu.appearance = state.appearance;
        pdu.dead_reckoning.algorithm = state.dead_reckoning_algorithm;
        pdu.marking = Marking::ascii(if state.marking.is_empty() { &snapshot.name } else { &state.marking });

        Some(Pdu::EntityState(pdu))
    }
}

/// Mirrors entities announced by other simulators as remote actors.
pub struct EntityStateIncomingAdaptor {
    mappings: Arc<ActorTypeMappings>,
}

impl EntityStateIncomingAdaptor {
    pub const ID: &'static str = "builtin.entity_state.incoming";

    pub fn new(mappings: Arc<ActorTypeMappings>) -> Self {
        Self { mappings }
    }

    fn discover(&self, pdu: &EntityStatePdu, state: EntityState, session: &mut NetworkSession) -> Option<ActorSnapshot> {
        let Some(binding) = self.mappings.for_entity_type(&pdu.entity_type) else {
            debug!("No mapping for entity type {}, ignoring entity {}", pdu.entity_type, pdu.entity_id);
            return None;
        };

        let actor = ActorId::new();
        let handle = session.allocate_handle();
        let identity = session.identity_mut();
        if !identity.put_entity_id(pdu.entity_id, actor) {
            return None;
        }
        identity.put_wire_handle(actor, handle);
        identity.put_type_binding(handle, Arc::clone(&binding));
        identity.put_object_name(pdu.entity_id.to_string(), actor);
        session.mark_remote(actor);

        info!("🛰️ Discovered entity {} as {} actor {}", pdu.entity_id, binding.actor_type, actor);
        Some(ActorSnapshot {
            id: actor,
            name: pdu.entity_id.to_string(),
            actor_type: binding.actor_type.clone(),
            is_remote: true,
            state,
        })
    }
}

fn state_from_pdu(pdu: &EntityStatePdu) -> EntityState {
    EntityState {
        location: pdu.location,
        velocity: pdu.linear_velocity,
        orientation: pdu.orientation,
        appearance: pdu.appearance,
        force_id: pdu.force_id,
        dead_reckoning_algorithm: pdu.dead_reckoning.algorithm,
        marking: pdu.marking.text(),
        entity_type: Some(pdu.entity_type),
    }
}

impl IncomingAdaptor for EntityStateIncomingAdaptor {
    fn id(&self) -> AdaptorId {
        AdaptorId::new(Self::ID)
    }

    fn convert(&self, pdu: &Pdu, session: &mut NetworkSession) -> Vec<ActorEvent> {
        let Pdu::EntityState(pdu) = pdu else {
            return Vec::new();
        };
        let state = state_from_pdu(pdu);

        let Some(actor) = session.identity().get_actor_by_entity_id(&pdu.entity_id) else {
            return self
                .discover(pdu, state, session)
                .map(|snapshot| vec![ActorEvent::created(snapshot, EventSource::Network)])
                .unwrap_or_default();
        };

        if !session.is_remote(&actor) {
            // our own traffic looped back
            debug!("Ignoring entity state for locally published entity {}", pdu.entity_id);
            return Vec::new();
        }

        let identity = session.identity();
        let actor_type = identity
            .get_wire_handle(&actor)
            .and_then(|handle| identity.get_type_binding(&handle))
            .map(|binding| binding.actor_type.clone())
            .unwrap_or_default();

        let snapshot = ActorSnapshot { id: actor, name: pdu.entity_id.to_string(), actor_type, is_remote: true, state };
        vec![ActorEvent::updated(snapshot, EventSource::Network)]
    }
}
