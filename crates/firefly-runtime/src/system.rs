//! Runtime system trait

use crate::clock::FrameTime;
use firefly_core::Result;
use firefly_ecs::FireflyWorld;

/// A system that can be ticked by the frame loop
///
/// Systems are updated in registration order. A system's update must leave
/// the world in a consistent state: all of its parallel work joins before it
/// returns, so the next system observes every write.
pub trait RuntimeSystem {
    /// Called once when the system is first registered
    fn initialize(&mut self, world: &mut FireflyWorld) -> Result<()>;

    /// Called once per frame
    fn update(&mut self, world: &mut FireflyWorld, time: FrameTime) -> Result<()>;

    /// Called when the system is being torn down; release owned resources here
    fn shutdown(&mut self, world: &mut FireflyWorld) -> Result<()>;

    /// Human-readable name for this system
    fn name(&self) -> &str;
}
