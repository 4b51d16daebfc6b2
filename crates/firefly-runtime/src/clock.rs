//! Frame clock

/// Time values handed to systems for one frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Total elapsed time in seconds, including this frame
    pub time: f32,
    /// Time since last frame in seconds
    pub delta: f32,
    /// Frame counter, starting at 0
    pub frame: u64,
}

impl FrameTime {
    pub fn new(time: f32, delta: f32) -> Self {
        Self {
            time,
            delta,
            frame: 0,
        }
    }
}

/// Tracks elapsed time advanced in explicit steps
pub struct GameClock {
    /// Total elapsed time in seconds
    pub total_time: f64,
    /// Time since last frame in seconds
    pub delta_time: f64,
    /// Largest delta a single frame may report
    pub max_delta: f64,
    /// Number of frames advanced so far
    frame: u64,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            max_delta: 0.25,
            frame: 0,
        }
    }
}

impl GameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt` seconds
    pub fn advance(&mut self, dt: f64) -> FrameTime {
        // Clamp to avoid a huge catch-up step after a stall
        self.delta_time = dt.clamp(0.0, self.max_delta);
        self.total_time += self.delta_time;
        let time = FrameTime {
            time: self.total_time as f32,
            delta: self.delta_time as f32,
            frame: self.frame,
        };
        self.frame += 1;
        time
    }

    /// Number of frames advanced so far
    pub fn frame_count(&self) -> u64 {
        self.frame
    }
}
