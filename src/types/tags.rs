//! Tag registry and per-entity tag sets.
//!
//! ## Index Stability
//!
//! Tags are referenced by slot index. Removing a tag clears its slot instead
//! of compacting the registry, so every other index held by networks, nodes
//! and connections stays valid. Cleared slots are never handed out again.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ids::TagId;

/// Ordered registry of tag names shared by a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRegistry {
    slots: Vec<Option<String>>,
}

impl TagRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag name and return its index.
    ///
    /// Registering a name that already exists returns the existing index.
    pub fn add(&mut self, name: &str) -> TagId {
        if let Some(id) = self.find(name) {
            return id;
        }
        self.slots.push(Some(name.to_string()));
        TagId::new((self.slots.len() - 1) as u32)
    }

    /// Clear a tag slot by name.
    ///
    /// Returns the cleared index so callers can strip it from tagged
    /// entities, or `None` if the name is not registered.
    pub fn remove(&mut self, name: &str) -> Option<TagId> {
        let id = self.find(name)?;
        self.slots[id.raw() as usize] = None;
        Some(id)
    }

    /// Look up the index of a tag name.
    pub fn find(&self, name: &str) -> Option<TagId> {
        self.slots
            .iter()
            .position(|slot| slot.as_deref() == Some(name))
            .map(|idx| TagId::new(idx as u32))
    }

    /// Get the name stored at an index, if the slot is live.
    pub fn name(&self, id: TagId) -> Option<&str> {
        self.slots.get(id.raw() as usize).and_then(|slot| slot.as_deref())
    }

    /// Iterate over live tags in index order.
    pub fn iter(&self) -> impl Iterator<Item = (TagId, &str)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_deref().map(|name| (TagId::new(idx as u32), name)))
    }

    /// Number of slots, including cleared ones.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of live tags.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Check whether the registry holds no live tags.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Set of tag indices held by a tagged entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<TagId>);

impl TagSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag index. Returns `false` if it was already present.
    pub fn insert(&mut self, id: TagId) -> bool {
        self.0.insert(id)
    }

    /// Remove a tag index. Returns `false` if it was not present.
    pub fn remove(&mut self, id: TagId) -> bool {
        self.0.remove(&id)
    }

    /// Check whether a tag index is present.
    pub fn contains(&self, id: TagId) -> bool {
        self.0.contains(&id)
    }

    /// Iterate over tag indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        self.0.iter().copied()
    }

    /// Add every index of another set.
    pub fn extend_from(&mut self, other: &TagSet) {
        self.0.extend(other.0.iter().copied());
    }

    /// Number of tags in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<TagId> for TagSet {
    fn from_iter<I: IntoIterator<Item = TagId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut registry = TagRegistry::new();
        let a = registry.add("water");
        let b = registry.add("water");
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_keeps_other_indices() {
        let mut registry = TagRegistry::new();
        let road = registry.add("road");
        let water = registry.add("water");
        let lava = registry.add("lava");

        assert_eq!(registry.remove("water"), Some(water));
        assert_eq!(registry.find("road"), Some(road));
        assert_eq!(registry.find("lava"), Some(lava));
        assert_eq!(registry.name(water), None);
        assert_eq!(registry.slot_count(), 3);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_cleared_slot_not_reused() {
        let mut registry = TagRegistry::new();
        let first = registry.add("first");
        registry.remove("first");
        let second = registry.add("first");
        assert_ne!(first, second);
    }

    #[test]
    fn test_tag_set_union() {
        let mut a: TagSet = [TagId::new(0), TagId::new(2)].into_iter().collect();
        let b: TagSet = [TagId::new(2), TagId::new(3)].into_iter().collect();
        a.extend_from(&b);
        assert_eq!(a.len(), 3);
        assert!(a.contains(TagId::new(3)));
    }
}
