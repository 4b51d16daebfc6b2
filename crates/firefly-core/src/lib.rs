//! Firefly Core - Foundational types for the Firefly effects
//!
//! This crate provides the core types that all other Firefly crates depend on:
//! - `ParticleId` - Stable per-particle identifiers used as random seeds
//! - `value01` / `hash32` - Stateless seed hashing for deterministic randomness
//! - `Transform` - Spatial placement of spawn sources and effector volumes
//! - Error types and Result alias

mod error;
mod hash;
mod id;
mod types;

pub use error::{FireflyError, Result};
pub use hash::{hash32, value01};
pub use id::{IdAllocator, ParticleId};
pub use types::{saturate, Transform};
