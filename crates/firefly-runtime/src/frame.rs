//! Frame loop driving registered systems

use crate::clock::{FrameTime, GameClock};
use crate::system::RuntimeSystem;
use firefly_core::{FireflyError, Result};
use firefly_ecs::FireflyWorld;

/// Owns the world and ticks systems in registration order
pub struct FrameLoop {
    pub world: FireflyWorld,
    pub clock: GameClock,
    systems: Vec<Box<dyn RuntimeSystem>>,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new(FireflyWorld::new())
    }
}

impl FrameLoop {
    pub fn new(world: FireflyWorld) -> Self {
        Self {
            world,
            clock: GameClock::new(),
            systems: Vec::new(),
        }
    }

    /// Register and initialize a system
    pub fn add_system(&mut self, mut system: Box<dyn RuntimeSystem>) -> Result<()> {
        system.initialize(&mut self.world)?;
        log::debug!("[firefly] registered system '{}'", system.name());
        self.systems.push(system);
        Ok(())
    }

    /// Advance the clock by `dt` seconds and update every system once
    pub fn step(&mut self, dt: f64) -> Result<FrameTime> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(FireflyError::RuntimeError(format!("invalid frame delta {dt}")));
        }
        let time = self.clock.advance(dt);
        for system in &mut self.systems {
            system.update(&mut self.world, time)?;
        }
        Ok(time)
    }

    /// Tear down every system in reverse registration order
    pub fn shutdown(&mut self) -> Result<()> {
        while let Some(mut system) = self.systems.pop() {
            system.shutdown(&mut self.world)?;
            log::debug!("[firefly] shut down system '{}'", system.name());
        }
        Ok(())
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }
}
