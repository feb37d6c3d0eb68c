//! Per-frame counters

/// Statistics of the most recent frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    /// Frames run so far
    pub frame: u64,
    /// Draw calls issued by the last frame
    pub draw_calls: usize,
    /// Renderables skipped by frustum culling during the last frame
    pub culled: usize,
    /// Wall-clock duration of the last frame in milliseconds
    pub frame_time_ms: f32,
    /// Frames per second over the last completed sampling window
    pub fps: f32,
    /// Start or update hooks that failed during the last frame
    pub update_faults: usize,
}
