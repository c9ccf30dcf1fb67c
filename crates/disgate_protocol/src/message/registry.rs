use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

/// Explicit identity of a registered adaptor.
///
/// Registration and removal are keyed by this id, so the same adaptor
/// instance may be shared between tags without ambiguity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdaptorId(pub String);

impl AdaptorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AdaptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AdaptorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Multimap from a dispatch tag to the adaptors registered for it, in
/// registration order.
pub struct AdaptorRegistry<Tag, A: ?Sized> {
    entries: HashMap<Tag, Vec<(AdaptorId, Arc<A>)>>,
}

impl<Tag, A: ?Sized> Default for AdaptorRegistry<Tag, A> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<Tag, A> AdaptorRegistry<Tag, A>
where
    Tag: Copy + Eq + Hash + fmt::Debug,
    A: ?Sized,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adaptor` under `tag`.
    ///
    /// Returns `false` if an adaptor with the same id is already registered
    /// for that tag, in which case nothing changes.
    pub fn add(&mut self, tag: Tag, id: AdaptorId, adaptor: Arc<A>) -> bool {
        let list = self.entries.entry(tag).or_default();
        if list.iter().any(|(existing, _)| *existing == id) {
            debug!("Adaptor '{}' already registered for {:?}", id, tag);
            return false;
        }
        list.push((id, adaptor));
        true
    }

    /// Unregisters the adaptor with `id` from `tag`. Returns `false` when it
    /// was not registered.
    pub fn remove(&mut self, tag: Tag, id: &AdaptorId) -> bool {
        let Some(list) = self.entries.get_mut(&tag) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.entries.remove(&tag);
        }
        removed
    }

    /// Adaptors registered for `tag`, cloned so the caller may hold them
    /// while mutating other state.
    pub fn adaptors_for(&self, tag: Tag) -> Vec<Arc<A>> {
        self.entries
            .get(&tag)
            .map(|list| list.iter().map(|(_, adaptor)| Arc::clone(adaptor)).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, tag: Tag, id: &AdaptorId) -> bool {
        self.entries.get(&tag).is_some_and(|list| list.iter().any(|(existing, _)| existing == id))
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Number of (tag, adaptor) pairs.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Every registered (tag, id) pair.
    pub fn registrations(&self) -> Vec<(Tag, AdaptorId)> {
        self.entries
            .iter()
            .flat_map(|(tag, list)| list.iter().map(move |(id, _)| (*tag, id.clone())))
            .collect()
    }

    /// Unregisters every adaptor not listed in `keep`, returning how many
    /// were removed.
    pub fn retain_registrations(&mut self, keep: &[(Tag, AdaptorId)]) -> usize {
        let mut removed = 0;
        self.entries.retain(|tag, list| {
            let before = list.len();
            list.retain(|(id, _)| keep.iter().any(|(kept_tag, kept_id)| kept_tag == tag && kept_id == id));
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }
}

impl<Tag: fmt::Debug, A: ?Sized> fmt::Debug for AdaptorRegistry<Tag, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (tag, list) in &self.entries {
            let ids: Vec<&str> = list.iter().map(|(id, _)| id.0.as_str()).collect();
            map.entry(tag, &ids);
        }
        map.finish()
    }
}
