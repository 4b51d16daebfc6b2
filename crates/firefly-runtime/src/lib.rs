//! Firefly Runtime - Frame loop infrastructure
//!
//! Provides the building blocks the particle pipeline runs on:
//! - `GameClock` / `FrameTime` - elapsed and delta time for each frame
//! - `parallel_for` - data-parallel dispatch over work-item indices
//! - `RuntimeSystem` - trait for systems ticked by the frame loop
//! - `FrameLoop` - owns the world and ticks systems in registration order

mod clock;
mod frame;
mod jobs;
mod system;

pub use clock::{FrameTime, GameClock};
pub use frame::FrameLoop;
pub use jobs::{parallel_for, parallel_for_each_mut, timed};
pub use system::RuntimeSystem;
