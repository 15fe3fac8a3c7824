//! Child registry
//!
//! Ordered key → entry map backing the group reconciler. Each entry pairs
//! the latest rendered descriptor with the machine that owns its lifecycle.
//! Only the reconciler mutates this map; machines are never shared across
//! keys.

use crate::key::ChildKey;
use indexmap::IndexMap;
use presence_core::TransitionMachine;

/// One tracked child.
pub struct RegistryEntry<C> {
    /// Latest rendered descriptor for this key
    pub child: C,
    /// State machine exclusively owned by this entry
    pub machine: TransitionMachine,
    /// Set when the key left the logical child list; the entry survives
    /// until the exit completes, and is cleared if the key reappears first.
    pub pending_removal: bool,
}

/// Insertion-ordered registry of tracked children.
pub struct ChildRegistry<C> {
    entries: IndexMap<ChildKey, RegistryEntry<C>>,
}

impl<C> ChildRegistry<C> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, key: ChildKey, entry: RegistryEntry<C>) {
        self.entries.insert(key, entry);
    }

    pub fn get(&self, key: &ChildKey) -> Option<&RegistryEntry<C>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &ChildKey) -> Option<&mut RegistryEntry<C>> {
        self.entries.get_mut(key)
    }

    /// Remove an entry, preserving the order of the rest.
    pub fn remove(&mut self, key: &ChildKey) -> Option<RegistryEntry<C>> {
        self.entries.shift_remove(key)
    }

    pub fn contains(&self, key: &ChildKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ChildKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChildKey, &RegistryEntry<C>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C> Default for ChildRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
