//! Shared component storage
//!
//! A shared component is a value owned once by the world and referenced by
//! any number of entities. Entities carry a `SharedIndex<T>` component; the
//! index is `Copy + Hash + Eq`, so grouping entities by shared value is a
//! plain hash partition on that component.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Typed handle to a value in a `SharedStore<T>`
pub struct SharedIndex<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SharedIndex<T> {
    pub fn from_raw(index: u32) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    pub fn raw(&self) -> u32 {
        self.index
    }
}

impl<T> Clone for SharedIndex<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SharedIndex<T> {}

impl<T> PartialEq for SharedIndex<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for SharedIndex<T> {}

impl<T> Hash for SharedIndex<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> PartialOrd for SharedIndex<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for SharedIndex<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> fmt::Debug for SharedIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedIndex({})", self.index)
    }
}

/// Slot storage for one shared component type
///
/// Removed slots are left empty rather than compacted so that outstanding
/// indices never alias a different value.
pub struct SharedStore<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for SharedStore<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> SharedStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value and return its index
    pub fn insert(&mut self, value: T) -> SharedIndex<T> {
        let index = self.slots.len() as u32;
        self.slots.push(Some(value));
        SharedIndex::from_raw(index)
    }

    /// Get a stored value
    pub fn get(&self, index: SharedIndex<T>) -> Option<&T> {
        self.slots.get(index.raw() as usize)?.as_ref()
    }

    /// Get a stored value mutably
    pub fn get_mut(&mut self, index: SharedIndex<T>) -> Option<&mut T> {
        self.slots.get_mut(index.raw() as usize)?.as_mut()
    }

    /// Iterate live values with their indices
    pub fn iter(&self) -> impl Iterator<Item = (SharedIndex<T>, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (SharedIndex::from_raw(i as u32), v)))
    }

    /// Iterate live values mutably with their indices
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SharedIndex<T>, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|v| (SharedIndex::from_raw(i as u32), v)))
    }

    /// Take every live value out of the store
    pub fn drain(&mut self) -> Vec<(SharedIndex<T>, T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.take().map(|v| (SharedIndex::from_raw(i as u32), v)))
            .collect()
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: PartialEq> SharedStore<T> {
    /// Store a value unless an equal one is already present
    ///
    /// Entities created from equal settings then land in the same group.
    pub fn intern(&mut self, value: T) -> SharedIndex<T> {
        if let Some((index, _)) = self.iter().find(|(_, v)| **v == value) {
            return index;
        }
        self.insert(value)
    }
}

/// Type-keyed collection of shared stores
#[derive(Default)]
pub struct SharedRegistry {
    stores: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the store for `T`, if one was ever created
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&SharedStore<T>> {
        self.stores
            .get(&TypeId::of::<T>())
            .and_then(|s| s.downcast_ref::<SharedStore<T>>())
    }

    /// Get the store for `T`, creating an empty one on first use
    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> &mut SharedStore<T> {
        let store = self
            .stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SharedStore::<T>::new()));
        match store.downcast_mut::<SharedStore<T>>() {
            Some(store) => store,
            None => unreachable!("shared store registered under a foreign TypeId"),
        }
    }

    /// Look up a single shared value
    pub fn value<T: Send + Sync + 'static>(&self, index: SharedIndex<T>) -> Option<&T> {
        self.get::<T>()?.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Settings {
        life: f32,
    }

    #[test]
    fn insert_and_get() {
        let mut store = SharedStore::new();
        let a = store.insert(Settings { life: 1.0 });
        let b = store.insert(Settings { life: 2.0 });
        assert_ne!(a, b);
        assert_eq!(store.get(b).map(|s| s.life), Some(2.0));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn intern_deduplicates() {
        let mut store = SharedStore::new();
        let a = store.intern(Settings { life: 1.0 });
        let b = store.intern(Settings { life: 1.0 });
        let c = store.intern(Settings { life: 3.0 });
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn drained_slots_are_not_reused() {
        let mut store = SharedStore::new();
        let a = store.insert(Settings { life: 1.0 });
        assert_eq!(store.drain().len(), 1);
        let b = store.insert(Settings { life: 1.0 });
        assert_ne!(a, b);
        assert!(store.get(a).is_none());
        assert!(!store.is_empty());
    }

    #[test]
    fn registry_creates_store_on_demand() {
        let mut registry = SharedRegistry::new();
        assert!(registry.get::<Settings>().is_none());
        let idx = registry.get_mut::<Settings>().insert(Settings { life: 5.0 });
        assert_eq!(registry.value(idx).map(|s| s.life), Some(5.0));
    }

    #[test]
    fn drain_empties_store() {
        let mut store = SharedStore::new();
        store.insert(Settings { life: 1.0 });
        store.insert(Settings { life: 2.0 });
        assert_eq!(store.drain().len(), 2);
        assert!(store.is_empty());
    }
}
