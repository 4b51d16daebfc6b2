//! Firefly ECS - Entity storage with shared-component grouping
//!
//! This crate wraps hecs with the small subset of host-engine features the
//! particle pipeline consumes:
//! - per-entity typed components (plain hecs components)
//! - shared components: values stored once, referenced by many entities
//!   through a `SharedIndex<T>` that doubles as a grouping key
//! - a deferred command queue for structural changes made during parallel passes

mod commands;
mod component;
mod world;

pub use commands::DeferredCommands;
pub use component::{SharedIndex, SharedRegistry, SharedStore};
pub use world::FireflyWorld;

pub use hecs::Entity;
