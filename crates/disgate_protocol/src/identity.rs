//! # Entity Identity Map
//!
//! Bidirectional correlation between local actors and their network
//! identities. Every actor known to the bridge owns exactly one
//! [`IdentityBinding`]; each optional leg of a binding (wire handle, entity
//! identifier, object name) is unique across the whole map.
//!
//! Bindings live in an arena addressed by [`BindingKey`]. The per-leg lookup
//! tables store keys, never references, so removing a binding through any
//! leg is a single slot release plus one index removal per populated leg.
//!
//! Every `put_*` operation validates all affected legs before it touches
//! anything: a rejected put leaves the map exactly as it was.

use crate::types::{ActorId, EntityIdentifier, ObjectTypeBinding, WireObjectHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Stable index of a binding slot inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingKey(u32);

/// Correlation record for one actor.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityBinding {
    pub actor: ActorId,
    pub wire_handle: Option<WireObjectHandle>,
    pub entity_id: Option<EntityIdentifier>,
    pub type_binding: Option<Arc<ObjectTypeBinding>>,
    pub object_name: Option<String>,
}

impl IdentityBinding {
    fn new(actor: ActorId) -> Self {
        Self {
            actor,
            wire_handle: None,
            entity_id: None,
            type_binding: None,
            object_name: None,
        }
    }
}

/// Result of validating a put against the current contents.
enum Staged {
    /// The exact pair is already stored
    AlreadyBound,
    /// Attach the leg to an existing binding
    Attach(BindingKey),
    /// Create a fresh binding for the actor
    Create,
}

#[derive(Debug, Default)]
pub struct EntityIdentityMap {
    slots: Vec<Option<IdentityBinding>>,
    free: Vec<BindingKey>,
    by_actor: HashMap<ActorId, BindingKey>,
    by_handle: HashMap<WireObjectHandle, BindingKey>,
    by_entity: HashMap<EntityIdentifier, BindingKey>,
    by_name: HashMap<String, BindingKey>,
}

impl EntityIdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `actor` to `handle`.
    ///
    /// Returns `false` without mutating anything when the actor already has a
    /// different handle or the handle already belongs to a different actor.
    /// Putting an existing pair again succeeds.
    pub fn put_wire_handle(&mut self, actor: ActorId, handle: WireObjectHandle) -> bool {
        let staged = self.stage(actor, self.by_handle.get(&handle).copied(), |b| b.wire_handle == Some(handle), |b| {
            b.wire_handle.is_some()
        });
        let Some(staged) = staged else {
            debug!("Rejected binding {} <-> handle {}: leg already bound elsewhere", actor, handle);
            return false;
        };

        if let Some(key) = self.commit(actor, staged) {
            if let Some(binding) = self.slot_mut(key) {
                binding.wire_handle = Some(handle);
            }
            self.by_handle.insert(handle, key);
        }
        true
    }

    /// Binds a DIS entity identifier to `actor`.
    ///
    /// Same uniqueness contract as [`put_wire_handle`](Self::put_wire_handle).
    /// An actor that has no binding yet gets one, which is how locally
    /// published actors receive their entity id before a handle exists.
    pub fn put_entity_id(&mut self, entity_id: EntityIdentifier, actor: ActorId) -> bool {
        let staged = self.stage(actor, self.by_entity.get(&entity_id).copied(), |b| b.entity_id == Some(entity_id), |b| {
            b.entity_id.is_some()
        });
        let Some(staged) = staged else {
            debug!("Rejected binding {} <-> entity {}: leg already bound elsewhere", actor, entity_id);
            return false;
        };

        if let Some(key) = self.commit(actor, staged) {
            if let Some(binding) = self.slot_mut(key) {
                binding.entity_id = Some(entity_id);
            }
            self.by_entity.insert(entity_id, key);
        }
        true
    }

    /// Binds a federation-wide object instance name to `actor`.
    pub fn put_object_name(&mut self, name: impl Into<String>, actor: ActorId) -> bool {
        let name = name.into();
        let staged = self.stage(actor, self.by_name.get(&name).copied(), |b| b.object_name.as_ref() == Some(&name), |b| {
            b.object_name.is_some()
        });
        let Some(staged) = staged else {
            debug!("Rejected binding {} <-> object name '{}': leg already bound elsewhere", actor, name);
            return false;
        };

        if let Some(key) = self.commit(actor, staged) {
            if let Some(binding) = self.slot_mut(key) {
                binding.object_name = Some(name.clone());
            }
            self.by_name.insert(name, key);
        }
        true
    }

    /// Attaches a type binding to an already registered wire handle.
    ///
    /// Fails when the handle is unknown or a different type binding is
    /// already attached. Attaching an equal binding again succeeds.
    pub fn put_type_binding(&mut self, handle: WireObjectHandle, type_binding: Arc<ObjectTypeBinding>) -> bool {
        let Some(key) = self.by_handle.get(&handle).copied() else {
            debug!("Cannot attach type binding to unknown handle {}", handle);
            return false;
        };
        let Some(binding) = self.slot_mut(key) else {
            return false;
        };

        match &binding.type_binding {
            Some(existing) if **existing == *type_binding => true,
            Some(existing) => {
                debug!(
                    "Handle {} already bound to class '{}', refusing '{}'",
                    handle, existing.object_class, type_binding.object_class
                );
                false
            }
            None => {
                binding.type_binding = Some(type_binding);
                true
            }
        }
    }

    pub fn get_actor_by_wire_handle(&self, handle: &WireObjectHandle) -> Option<ActorId> {
        self.by_handle.get(handle).and_then(|key| self.slot(*key)).map(|b| b.actor)
    }

    pub fn get_actor_by_entity_id(&self, entity_id: &EntityIdentifier) -> Option<ActorId> {
        self.by_entity.get(entity_id).and_then(|key| self.slot(*key)).map(|b| b.actor)
    }

    pub fn get_actor_by_object_name(&self, name: &str) -> Option<ActorId> {
        self.by_name.get(name).and_then(|key| self.slot(*key)).map(|b| b.actor)
    }

    pub fn get_wire_handle(&self, actor: &ActorId) -> Option<WireObjectHandle> {
        self.binding(actor).and_then(|b| b.wire_handle)
    }

    pub fn get_entity_id(&self, actor: &ActorId) -> Option<EntityIdentifier> {
        self.binding(actor).and_then(|b| b.entity_id)
    }

    pub fn get_object_name(&self, actor: &ActorId) -> Option<&str> {
        self.binding(actor).and_then(|b| b.object_name.as_deref())
    }

    pub fn get_type_binding(&self, handle: &WireObjectHandle) -> Option<Arc<ObjectTypeBinding>> {
        self.by_handle
            .get(handle)
            .and_then(|key| self.slot(*key))
            .and_then(|b| b.type_binding.clone())
    }

    /// Full record for an actor, if any leg is bound.
    pub fn binding(&self, actor: &ActorId) -> Option<&IdentityBinding> {
        self.by_actor.get(actor).and_then(|key| self.slot(*key))
    }

    /// Removes the tuple the handle belongs to. No-op when absent.
    pub fn remove_by_wire_handle(&mut self, handle: &WireObjectHandle) -> Option<IdentityBinding> {
        let key = self.by_handle.get(handle).copied()?;
        self.release(key)
    }

    /// Removes the tuple the entity identifier belongs to. No-op when absent.
    pub fn remove_by_entity_id(&mut self, entity_id: &EntityIdentifier) -> Option<IdentityBinding> {
        let key = self.by_entity.get(entity_id).copied()?;
        self.release(key)
    }

    /// Removes the tuple the object name belongs to. No-op when absent.
    pub fn remove_by_object_name(&mut self, name: &str) -> Option<IdentityBinding> {
        let key = self.by_name.get(name).copied()?;
        self.release(key)
    }

    /// Removes everything bound to `actor`. No-op when absent.
    pub fn remove_by_actor(&mut self, actor: &ActorId) -> Option<IdentityBinding> {
        let key = self.by_actor.get(actor).copied()?;
        self.release(key)
    }

    /// Drops every binding and index entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.by_actor.clear();
        self.by_handle.clear();
        self.by_entity.clear();
        self.by_name.clear();
    }

    /// Appends every bound actor id to `out`.
    pub fn get_all_actor_ids(&self, out: &mut Vec<ActorId>) {
        out.extend(self.by_actor.keys().copied());
    }

    /// Snapshot of every bound actor id.
    pub fn all_actor_ids(&self) -> Vec<ActorId> {
        let mut ids = Vec::with_capacity(self.by_actor.len());
        self.get_all_actor_ids(&mut ids);
        ids
    }

    pub fn len(&self) -> usize {
        self.by_actor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_actor.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IdentityBinding> {
        self.slots.iter().flatten()
    }

    /// Decides what a put of one leg would do, without mutating.
    ///
    /// `leg_owner` is the binding currently holding the leg value,
    /// `holds_same` tests whether a binding already holds exactly this value
    /// and `holds_any` whether it holds some value for the leg.
    fn stage(
        &self,
        actor: ActorId,
        leg_owner: Option<BindingKey>,
        holds_same: impl Fn(&IdentityBinding) -> bool,
        holds_any: impl Fn(&IdentityBinding) -> bool,
    ) -> Option<Staged> {
        let actor_key = self.by_actor.get(&actor).copied();

        match (actor_key, leg_owner) {
            (Some(actor_key), Some(owner)) if actor_key == owner => Some(Staged::AlreadyBound),
            // the leg value belongs to another actor
            (_, Some(_)) => None,
            (Some(actor_key), None) => {
                let binding = self.slot(actor_key)?;
                if holds_same(binding) {
                    Some(Staged::AlreadyBound)
                } else if holds_any(binding) {
                    None
                } else {
                    Some(Staged::Attach(actor_key))
                }
            }
            (None, None) => Some(Staged::Create),
        }
    }

    /// Applies a successful staging. Returns the slot to write the leg into,
    /// or `None` when nothing needs to change.
    fn commit(&mut self, actor: ActorId, staged: Staged) -> Option<BindingKey> {
        match staged {
            Staged::AlreadyBound => None,
            Staged::Attach(key) => Some(key),
            Staged::Create => {
                let key = self.allocate(IdentityBinding::new(actor));
                self.by_actor.insert(actor, key);
                Some(key)
            }
        }
    }

    fn allocate(&mut self, binding: IdentityBinding) -> BindingKey {
        if let Some(key) = self.free.pop() {
            self.slots[key.0 as usize] = Some(binding);
            key
        } else {
            let key = BindingKey(self.slots.len() as u32);
            self.slots.push(Some(binding));
            key
        }
    }

    fn release(&mut self, key: BindingKey) -> Option<IdentityBinding> {
        let binding = self.slots.get_mut(key.0 as usize)?.take()?;
        self.free.push(key);

        self.by_actor.remove(&binding.actor);
        if let Some(handle) = &binding.wire_handle {
            self.by_handle.remove(handle);
        }
        if let Some(entity_id) = &binding.entity_id {
            self.by_entity.remove(entity_id);
        }
        if let Some(name) = &binding.object_name {
            self.by_name.remove(name);
        }
        Some(binding)
    }

    fn slot(&self, key: BindingKey) -> Option<&IdentityBinding> {
        self.slots.get(key.0 as usize).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, key: BindingKey) -> Option<&mut IdentityBinding> {
        self.slots.get_mut(key.0 as usize).and_then(Option::as_mut)
    }
}
