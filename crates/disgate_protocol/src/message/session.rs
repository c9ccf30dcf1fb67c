use crate::identity::{EntityIdentityMap, IdentityBinding};
use crate::pdu::ByteOrder;
use crate::types::{ActorId, EntityIdentifier, WireObjectHandle};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Exercise-wide DIS parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisSettings {
    #[serde(default = "default_exercise_id")]
    pub exercise_id: u8,
    #[serde(default = "default_site_id")]
    pub site_id: u16,
    #[serde(default = "default_application_id")]
    pub application_id: u16,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u8,
    #[serde(default)]
    pub byte_order: ByteOrder,
}

fn default_exercise_id() -> u8 {
    1
}

fn default_site_id() -> u16 {
    1
}

fn default_application_id() -> u16 {
    1
}

/// IEEE 1278.1a-1998
fn default_protocol_version() -> u8 {
    6
}

impl Default for DisSettings {
    fn default() -> Self {
        Self {
            exercise_id: default_exercise_id(),
            site_id: default_site_id(),
            application_id: default_application_id(),
            protocol_version: default_protocol_version(),
            byte_order: ByteOrder::default(),
        }
    }
}

/// State shared by the incoming and outgoing paths for one connection:
/// the identity map plus the counters used to mint new identifiers.
#[derive(Debug)]
pub struct NetworkSession {
    settings: DisSettings,
    identity: EntityIdentityMap,
    /// Actors this session created from network traffic
    remote: HashSet<ActorId>,
    next_handle: u32,
    next_entity: u16,
    next_request: u32,
}

impl NetworkSession {
    pub fn new(settings: DisSettings) -> Self {
        Self {
            settings,
            identity: EntityIdentityMap::new(),
            remote: HashSet::new(),
            next_handle: 1,
            next_entity: 1,
            next_request: 1,
        }
    }

    pub fn settings(&self) -> &DisSettings {
        &self.settings
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.settings.byte_order
    }

    pub fn identity(&self) -> &EntityIdentityMap {
        &self.identity
    }

    pub fn identity_mut(&mut self) -> &mut EntityIdentityMap {
        &mut self.identity
    }

    /// Mints a handle not currently bound to any actor. Zero is never issued.
    pub fn allocate_handle(&mut self) -> WireObjectHandle {
        loop {
            let candidate = WireObjectHandle(self.next_handle);
            self.next_handle = self.next_handle.wrapping_add(1).max(1);
            if self.identity.get_actor_by_wire_handle(&candidate).is_none() {
                return candidate;
            }
        }
    }

    /// Mints an entity identifier under this application's site and
    /// application numbers.
    ///
    /// Entity numbers 0 and 0xFFFF are reserved by DIS and skipped, as are
    /// numbers already bound. Returns `None` once every number is in use.
    pub fn allocate_entity_id(&mut self) -> Option<EntityIdentifier> {
        const USABLE: usize = 0xFFFE;

        for _ in 0..USABLE {
            let entity = self.next_entity;
            self.next_entity = if entity >= 0xFFFE { 1 } else { entity + 1 };

            let candidate = EntityIdentifier::new(self.settings.site_id, self.settings.application_id, entity);
            if self.identity.get_actor_by_entity_id(&candidate).is_none() {
                return Some(candidate);
            }
        }
        None
    }

    /// Records that `actor` mirrors an entity owned by another simulator.
    pub fn mark_remote(&mut self, actor: ActorId) {
        self.remote.insert(actor);
    }

    pub fn is_remote(&self, actor: &ActorId) -> bool {
        self.remote.contains(actor)
    }

    pub fn remote_actors(&self) -> impl Iterator<Item = &ActorId> {
        self.remote.iter()
    }

    /// Drops every binding of `actor`, including its remote marker.
    pub fn release_actor(&mut self, actor: &ActorId) -> Option<IdentityBinding> {
        self.remote.remove(actor);
        self.identity.remove_by_actor(actor)
    }

    pub fn next_request_id(&mut self) -> u32 {
        let id = self.next_request;
        self.next_request = self.next_request.wrapping_add(1);
        id
    }

    /// Forgets every binding and restarts the counters.
    pub fn reset(&mut self) {
        self.identity.clear();
        self.remote.clear();
        self.next_handle = 1;
        self.next_entity = 1;
        self.next_request = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ids_skip_bound_numbers() {
        let mut session = NetworkSession::new(DisSettings { site_id: 3, application_id: 9, ..Default::default() });
        let squatter = ActorId::new();
        assert!(session.identity_mut().put_entity_id(EntityIdentifier::new(3, 9, 1), squatter));

        assert_eq!(session.allocate_entity_id(), Some(EntityIdentifier::new(3, 9, 2)));
        assert_eq!(session.allocate_entity_id(), Some(EntityIdentifier::new(3, 9, 3)));
    }

    #[test]
    fn test_entity_counter_wraps_before_reserved_value() {
        let mut session = NetworkSession::new(DisSettings::default());
        session.next_entity = 0xFFFE;
        assert_eq!(session.allocate_entity_id().map(|id| id.entity), Some(0xFFFE));
        assert_eq!(session.allocate_entity_id().map(|id| id.entity), Some(1));
    }

    #[test]
    fn test_handles_start_at_one_and_reset() {
        let mut session = NetworkSession::new(DisSettings::default());
        assert_eq!(session.allocate_handle(), WireObjectHandle(1));
        assert_eq!(session.allocate_handle(), WireObjectHandle(2));

        session.identity_mut().put_wire_handle(ActorId::new(), WireObjectHandle(3));
        assert_eq!(session.allocate_handle(), WireObjectHandle(4));

        let mirrored = ActorId::new();
        session.mark_remote(mirrored);
        session.reset();
        assert!(session.identity().is_empty());
        assert!(!session.is_remote(&mirrored));
        assert_eq!(session.allocate_handle(), WireObjectHandle(1));
    }
}
