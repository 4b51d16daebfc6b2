//! Deferred structural changes

use hecs::{CommandBuffer, Entity};

/// Queue of structural changes recorded while components are being read,
/// applied single-threaded at a sync point.
///
/// Destroying entities while a parallel pass still iterates their storage is
/// undefined, so passes collect their verdicts first and the queue is flushed
/// only after the pass has joined.
pub struct DeferredCommands {
    buffer: CommandBuffer,
    pending_destroys: usize,
}

impl Default for DeferredCommands {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferredCommands {
    pub fn new() -> Self {
        Self {
            buffer: CommandBuffer::new(),
            pending_destroys: 0,
        }
    }

    /// Queue an entity for destruction
    pub fn destroy(&mut self, entity: Entity) {
        self.buffer.despawn(entity);
        self.pending_destroys += 1;
    }

    /// Queue a batch of entities for destruction
    pub fn destroy_all(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            self.destroy(entity);
        }
    }

    /// Number of destroys queued since the last flush
    pub fn pending_destroys(&self) -> usize {
        self.pending_destroys
    }

    pub fn is_empty(&self) -> bool {
        self.pending_destroys == 0
    }

    /// Apply every queued change and return the number of destroys that were queued
    pub(crate) fn flush(&mut self, world: &mut hecs::World) -> usize {
        let applied = self.pending_destroys;
        self.buffer.run_on(world);
        self.pending_destroys = 0;
        applied
    }
}
