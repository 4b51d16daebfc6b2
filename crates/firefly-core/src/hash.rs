//! Stateless seed hashing for deterministic per-particle randomness
//!
//! Particles never carry a mutable RNG. Every random quantity (flap frequency,
//! life randomization, variant choice) is derived from a stable seed through a
//! pure hash, so the same particle produces the same values on any thread and
//! in any frame.

/// Scramble a 32-bit seed into a well-distributed 32-bit value.
pub fn hash32(seed: u32) -> u32 {
    let mut s = seed ^ 0xA3C5_9AC3;
    s = s.wrapping_mul(0x9E37_79B9);
    s ^= s >> 16;
    s = s.wrapping_mul(0x9E37_79B9);
    s ^= s >> 16;
    s.wrapping_mul(0x9E37_79B9)
}

/// Hash a seed to a float in [0, 1).
///
/// Only the top 24 bits are used so the result is exactly representable and
/// can never round up to 1.0.
pub fn value01(seed: u32) -> f32 {
    (hash32(seed) >> 8) as f32 / (1u32 << 24) as f32
}
