//! Lock-free append counter used to claim output triangle slots

use std::sync::atomic::{AtomicU32, Ordering};

/// A single atomic integer shared by every worker of a reconstruction pass.
///
/// `reset` takes `&mut self`, so the compiler guarantees nobody is
/// incrementing while the counter is zeroed.
#[derive(Debug, Default)]
pub struct AppendCounter {
    value: AtomicU32,
}

impl AppendCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the counter back to 0 before a new pass
    pub fn reset(&mut self) {
        *self.value.get_mut() = 0;
    }

    /// Claim the next slot.
    ///
    /// Returns the zero-based slot index this call owns. Every call gets a
    /// distinct value; the order in which concurrent callers receive them is
    /// unspecified.
    pub fn increment(&self) -> u32 {
        self.value.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of slots claimed since the last reset
    pub fn value(&self) -> u32 {
        self.value.load(Ordering::Relaxed)
    }
}
