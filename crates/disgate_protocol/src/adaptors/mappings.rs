use crate::types::{ActorType, EntityType, ObjectTypeBinding};
use std::sync::Arc;

/// Configured correspondence between local actor types and network object
/// classes.
///
/// Outgoing traffic looks a binding up by actor type; incoming traffic by
/// the most specific entity type pattern that matches.
#[derive(Debug, Clone, Default)]
pub struct ActorTypeMappings {
    bindings: Vec<Arc<ObjectTypeBinding>>,
}

impl ActorTypeMappings {
    pub fn new(bindings: impl IntoIterator<Item = ObjectTypeBinding>) -> Self {
        Self { bindings: bindings.into_iter().map(Arc::new).collect() }
    }

    pub fn push(&mut self, binding: ObjectTypeBinding) {
        self.bindings.push(Arc::new(binding));
    }

    /// First binding registered for `actor_type`.
    pub fn for_actor_type(&self, actor_type: &ActorType) -> Option<Arc<ObjectTypeBinding>> {
        self.bindings.iter().find(|b| b.actor_type == *actor_type).cloned()
    }

    /// Binding whose entity type pattern matches `entity_type` most
    /// specifically. Earlier bindings win ties.
    pub fn for_entity_type(&self, entity_type: &EntityType) -> Option<Arc<ObjectTypeBinding>> {
        let mut best: Option<(u32, &Arc<ObjectTypeBinding>)> = None;
        for binding in &self.bindings {
            let Some(rank) = binding.entity_type.as_ref().and_then(|pattern| pattern.rank_match(entity_type)) else {
                continue;
            };
            if best.map_or(true, |(top, _)| rank > top) {
                best = Some((rank, binding));
            }
        }
        best.map(|(_, binding)| Arc::clone(binding))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ObjectTypeBinding>> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
