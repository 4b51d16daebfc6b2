//! Per-particle random values derived from stable ids
//!
//! Nothing here keeps state: each value is a pure function of the particle
//! id, so the same particle looks the same on every frame and every run.

use firefly_core::{value01, ParticleId};

/// Mixed into the id so variant choice does not correlate with life
const VARIANT_SALT: u32 = 0x9E37_79B9;

/// Shortest life fraction any particle can draw
pub const MIN_LIFE_FRACTION: f32 = 0.2;

/// Life multiplier in `[0.2, 1.0)`
pub fn life_fraction(id: ParticleId) -> f32 {
    value01(id.seed()) * (1.0 - MIN_LIFE_FRACTION) + MIN_LIFE_FRACTION
}

/// Uniform sample used to pick the particle's variant
pub fn variant_sample(id: ParticleId) -> f32 {
    value01(id.seed() ^ VARIANT_SALT)
}

/// Wing beat frequency in radians per second, in `[8, 28)`
pub fn flap_frequency(id: ParticleId) -> f32 {
    8.0 + value01(id.seed()) * 20.0
}
