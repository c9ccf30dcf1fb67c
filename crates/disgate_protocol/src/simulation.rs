//! # Simulation Boundary
//!
//! The bridge never owns actors. It asks the simulation about them through
//! [`SimulationHandle`] and reports network-originated changes back through
//! the same trait.
//!
//! [`ActorRegistry`] is a small in-process simulation that implements the
//! trait. The `disgate` binary runs it when no engine is attached, and the
//! test suites use it to observe what the bridge delivers.

use crate::events::{ActorEvent, ActorSnapshot, EntityState, EventSource, LocalMessageType};
use crate::types::{ActorId, ActorType};
use std::collections::HashMap;
use tracing::debug;

pub trait SimulationHandle {
    /// Current snapshot of an actor, or `None` if the simulation has no such actor.
    fn find_actor(&self, id: &ActorId) -> Option<ActorSnapshot>;

    /// Delivers an event decoded from the network to the simulation.
    fn send_message(&mut self, event: ActorEvent);
}

#[derive(Debug, Default)]
pub struct ActorRegistry {
    actors: HashMap<ActorId, ActorSnapshot>,
    outbox: Vec<ActorEvent>,
    received: Vec<ActorEvent>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a locally owned actor and queues its creation event.
    pub fn spawn_local(&mut self, name: impl Into<String>, actor_type: ActorType, state: EntityState) -> ActorId {
        let snapshot = ActorSnapshot { id: ActorId::new(), name: name.into(), actor_type, is_remote: false, state };
        let id = snapshot.id;
        self.actors.insert(id, snapshot.clone());
        self.outbox.push(ActorEvent::created(snapshot, EventSource::Local));
        id
    }

    /// Replaces the state of a local actor and queues an update event.
    ///
    /// Returns `false` for unknown or remote actors.
    pub fn update_local(&mut self, id: &ActorId, state: EntityState) -> bool {
        match self.actors.get_mut(id) {
            Some(snapshot) if !snapshot.is_remote => {
                snapshot.state = state;
                self.outbox.push(ActorEvent::updated(snapshot.clone(), EventSource::Local));
                true
            }
            _ => false,
        }
    }

    /// Removes a local actor and queues its deletion event.
    pub fn delete_local(&mut self, id: &ActorId) -> bool {
        match self.actors.get(id) {
            Some(snapshot) if !snapshot.is_remote => {
                self.actors.remove(id);
                self.outbox.push(ActorEvent::deleted(*id, EventSource::Local));
                true
            }
            _ => false,
        }
    }

    /// Local events produced since the last drain, oldest first.
    pub fn drain_outbox(&mut self) -> Vec<ActorEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Network events delivered since the last call, oldest first.
    pub fn take_received(&mut self) -> Vec<ActorEvent> {
        std::mem::take(&mut self.received)
    }

    pub fn get(&self, id: &ActorId) -> Option<&ActorSnapshot> {
        self.actors.get(id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &ActorSnapshot> {
        self.actors.values()
    }

    pub fn remote_count(&self) -> usize {
        self.actors.values().filter(|a| a.is_remote).count()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

impl SimulationHandle for ActorRegistry {
    fn find_actor(&self, id: &ActorId) -> Option<ActorSnapshot> {
        self.actors.get(id).cloned()
    }

    fn send_message(&mut self, event: ActorEvent) {
        match (event.kind, &event.snapshot) {
            (LocalMessageType::ActorCreated | LocalMessageType::ActorUpdated, Some(snapshot)) => {
                let mut snapshot = snapshot.clone();
                snapshot.is_remote = true;
                self.actors.insert(snapshot.id, snapshot);
            }
            (LocalMessageType::ActorDeleted, _) => {
                self.actors.remove(&event.actor_id);
            }
            (kind, None) => {
                debug!("Ignoring {} for actor {} without a snapshot", kind, event.actor_id);
            }
        }
        self.received.push(event);
    }
}
