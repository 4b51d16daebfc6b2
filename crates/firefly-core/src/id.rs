//! Stable particle identifiers

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// A stable particle identifier.
///
/// Assigned once at spawn time and never reused while the allocator lives.
/// The raw value doubles as the particle's random seed, so it must not change
/// when entity storage is reordered or filtered.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Default)]
pub struct ParticleId(pub u32);

impl ParticleId {
    /// Create a ParticleId from a raw value
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Seed for stateless hashing
    pub fn seed(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParticleId({})", self.0)
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic allocator handing out contiguous blocks of particle IDs.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: AtomicU32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `count` consecutive IDs and return the first one.
    ///
    /// Wraps on overflow; after four billion particles seeds repeat, which
    /// only affects visual variety.
    pub fn reserve(&self, count: u32) -> ParticleId {
        ParticleId(self.next.fetch_add(count, Ordering::Relaxed))
    }

    /// The ID the next reservation will start at
    pub fn peek(&self) -> ParticleId {
        ParticleId(self.next.load(Ordering::Relaxed))
    }
}
