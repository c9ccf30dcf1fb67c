//! Actor lifecycle events exchanged between the simulation and the bridge.

use crate::types::{ActorId, ActorType, EntityType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag under which outgoing adaptors are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalMessageType {
    ActorCreated,
    ActorUpdated,
    ActorDeleted,
}

impl fmt::Display for LocalMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocalMessageType::ActorCreated => "actor_created",
            LocalMessageType::ActorUpdated => "actor_updated",
            LocalMessageType::ActorDeleted => "actor_deleted",
        };
        f.write_str(name)
    }
}

/// Where an event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Produced by the local simulation
    Local,
    /// Produced by decoding network traffic
    Network,
}

/// Replicated kinematic and presentation state of an actor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityState {
    pub location: [f64; 3],
    pub velocity: [f32; 3],
    pub orientation: [f32; 3],
    pub appearance: u32,
    pub force_id: u8,
    pub dead_reckoning_algorithm: u8,
    pub marking: String,
    /// DIS classification as last seen on the wire
    pub entity_type: Option<EntityType>,
}

/// What the simulation knows about one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub id: ActorId,
    pub name: String,
    pub actor_type: ActorType,
    /// Owned by another simulator; the local side only mirrors it
    pub is_remote: bool,
    pub state: EntityState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorEvent {
    pub kind: LocalMessageType,
    pub actor_id: ActorId,
    pub source: EventSource,
    pub snapshot: Option<ActorSnapshot>,
}

impl ActorEvent {
    pub fn created(snapshot: ActorSnapshot, source: EventSource) -> Self {
        Self { kind: LocalMessageType::ActorCreated, actor_id: snapshot.id, source, snapshot: Some(snapshot) }
    }

    pub fn updated(snapshot: ActorSnapshot, source: EventSource) -> Self {
        Self { kind: LocalMessageType::ActorUpdated, actor_id: snapshot.id, source, snapshot: Some(snapshot) }
    }

    pub fn deleted(actor_id: ActorId, source: EventSource) -> Self {
        Self { kind: LocalMessageType::ActorDeleted, actor_id, source, snapshot: None }
    }

    pub fn is_from_network(&self) -> bool {
        self.source == EventSource::Network
    }
}
