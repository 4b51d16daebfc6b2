//! FireflyWorld - entity storage with shared components and deferred commands

use crate::commands::DeferredCommands;
use crate::component::{SharedIndex, SharedRegistry, SharedStore};
use firefly_core::{FireflyError, Result};
use hecs::{Component, DynamicBundle, Entity};

/// The entity world consumed by the particle pipeline
///
/// Wraps hecs::World with:
/// - A registry of shared component values
/// - Deferred command application
pub struct FireflyWorld {
    /// The underlying hecs world
    world: hecs::World,
    /// Shared component values, keyed by type
    shared: SharedRegistry,
}

impl Default for FireflyWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl FireflyWorld {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            world: hecs::World::new(),
            shared: SharedRegistry::new(),
        }
    }

    /// Spawn an entity with the given components
    pub fn spawn(&mut self, components: impl DynamicBundle) -> Entity {
        self.world.spawn(components)
    }

    /// Spawn many entities with the same component layout
    pub fn spawn_batch<I>(&mut self, batch: I) -> Vec<Entity>
    where
        I: IntoIterator,
        I::Item: hecs::Bundle + 'static,
    {
        self.world.spawn_batch(batch).collect()
    }

    /// Detach a component from an entity, returning it
    pub fn remove_one<T: Component>(&mut self, entity: Entity) -> Result<T> {
        self.world.remove_one::<T>(entity).map_err(|e| match e {
            hecs::ComponentError::NoSuchEntity => {
                FireflyError::EntityNotFound(format!("{entity:?}"))
            }
            hecs::ComponentError::MissingComponent(m) => {
                FireflyError::ComponentNotFound(m.to_string())
            }
        })
    }

    /// Copy a component out of an entity
    pub fn get<T: Component + Clone>(&self, entity: Entity) -> Result<T> {
        self.world
            .get::<&T>(entity)
            .map(|c| (*c).clone())
            .map_err(|e| match e {
                hecs::ComponentError::NoSuchEntity => {
                    FireflyError::EntityNotFound(format!("{entity:?}"))
                }
                hecs::ComponentError::MissingComponent(m) => {
                    FireflyError::ComponentNotFound(m.to_string())
                }
            })
    }

    /// Whether an entity carries a component of type `T`
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.world
            .entity(entity)
            .map(|e| e.has::<T>())
            .unwrap_or(false)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    /// Get number of entities
    pub fn entity_count(&self) -> usize {
        self.world.len() as usize
    }

    /// Read access to the underlying component storage for queries
    pub fn ecs(&self) -> &hecs::World {
        &self.world
    }

    /// Write access to the underlying component storage for queries
    pub fn ecs_mut(&mut self) -> &mut hecs::World {
        &mut self.world
    }

    /// The shared store for `T`, if it exists
    pub fn shared<T: Send + Sync + 'static>(&self) -> Option<&SharedStore<T>> {
        self.shared.get::<T>()
    }

    /// The shared store for `T`, created on first use
    pub fn shared_mut<T: Send + Sync + 'static>(&mut self) -> &mut SharedStore<T> {
        self.shared.get_mut::<T>()
    }

    /// Look up a single shared value
    pub fn shared_value<T: Send + Sync + 'static>(&self, index: SharedIndex<T>) -> Option<&T> {
        self.shared.value(index)
    }

    /// Borrow component storage and shared values at the same time
    ///
    /// Passes that read components while writing into shared resources (the
    /// geometry buffers of a render target, for instance) need both halves.
    pub fn split_mut(&mut self) -> (&hecs::World, &mut SharedRegistry) {
        (&self.world, &mut self.shared)
    }

    /// Apply queued structural changes and return the number of destroys
    pub fn apply(&mut self, commands: &mut DeferredCommands) -> usize {
        commands.flush(&mut self.world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Age(f32);

    #[derive(Clone, Debug, PartialEq)]
    struct Marker;

    #[test]
    fn test_spawn_and_get() {
        let mut world = FireflyWorld::new();
        let e = world.spawn((Age(1.5),));

        assert!(world.contains(e));
        assert_eq!(world.get::<Age>(e).unwrap(), Age(1.5));
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn test_remove_marker() {
        let mut world = FireflyWorld::new();
        let e = world.spawn((Age(0.0), Marker));
        assert!(world.has::<Marker>(e));

        world.remove_one::<Marker>(e).unwrap();
        assert!(!world.has::<Marker>(e));
        assert!(matches!(
            world.remove_one::<Marker>(e),
            Err(FireflyError::ComponentNotFound(_))
        ));
    }

    #[test]
    fn test_spawn_batch() {
        let mut world = FireflyWorld::new();
        let entities = world.spawn_batch((0..5).map(|i| (Age(i as f32),)));
        assert_eq!(entities.len(), 5);
        assert_eq!(world.get::<Age>(entities[3]).unwrap(), Age(3.0));
    }

    #[test]
    fn test_deferred_destroy() {
        let mut world = FireflyWorld::new();
        let a = world.spawn((Age(0.0),));
        let b = world.spawn((Age(9.0),));

        let mut commands = DeferredCommands::new();
        commands.destroy(b);
        // Nothing happens until the queue is applied
        assert!(world.contains(b));

        assert_eq!(world.apply(&mut commands), 1);
        assert!(world.contains(a));
        assert!(!world.contains(b));
        assert!(commands.is_empty());
    }

    #[test]
    fn test_shared_values() {
        let mut world = FireflyWorld::new();
        let idx = world.shared_mut::<Age>().insert(Age(4.0));
        let e = world.spawn((idx,));

        let key = world.get::<SharedIndex<Age>>(e).unwrap();
        assert_eq!(world.shared_value(key), Some(&Age(4.0)));
    }
}
