//! Time management utilities
//!
//! The scene samples a [`TimeSource`] exactly once per frame and publishes
//! the sample through [`SceneTime`]. Tweens and behaviours read that sample,
//! so every consumer observes the same instant within a frame.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic clock the scene samples once per frame
pub trait TimeSource: Send {
    /// Seconds elapsed since the source was created
    fn seconds(&self) -> f64;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Create a clock starting at zero now
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl TimeSource for MonotonicClock {
    fn seconds(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same underlying counter, so a test can keep one copy
/// and hand the other to the scene.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let micros = u64::try_from(by.as_micros()).unwrap_or(u64::MAX);
        self.micros.fetch_add(micros, Ordering::SeqCst);
    }

    /// Move the clock forward by fractional seconds
    pub fn advance_secs(&self, seconds: f64) {
        self.advance(Duration::from_secs_f64(seconds.max(0.0)));
    }
}

impl TimeSource for ManualClock {
    #[allow(clippy::cast_precision_loss)]
    fn seconds(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

/// Frame-time sample shared between the scene and any reader thread
///
/// Only the owning scene advances it; everybody else reads.
#[derive(Debug, Default)]
pub struct SceneTime {
    current_bits: AtomicU64,
    delta_bits: AtomicU32,
    frame: AtomicU64,
}

impl SceneTime {
    /// Create a sample at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since scene start, as sampled at the beginning of the frame
    pub fn now_f64(&self) -> f64 {
        f64::from_bits(self.current_bits.load(Ordering::Acquire))
    }

    /// Seconds since scene start in single precision
    #[allow(clippy::cast_possible_truncation)]
    pub fn now(&self) -> f32 {
        self.now_f64() as f32
    }

    /// Seconds between the last two samples
    pub fn delta(&self) -> f32 {
        f32::from_bits(self.delta_bits.load(Ordering::Acquire))
    }

    /// Number of samples taken so far
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn advance(&self, now: f64) {
        let previous = self.now_f64();
        let delta = (now - previous).max(0.0) as f32;
        self.delta_bits.store(delta.to_bits(), Ordering::Release);
        self.current_bits.store(now.to_bits(), Ordering::Release);
        self.frame.fetch_add(1, Ordering::AcqRel);
    }
}

/// Simple stopwatch for measuring elapsed time
#[derive(Debug)]
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        let running = self.start_time.map_or(Duration::ZERO, |start| start.elapsed());
        self.elapsed + running
    }

    /// Get the elapsed time in milliseconds
    pub fn elapsed_millis(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_manual_clock_clones_share_state() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance_secs(1.5);
        assert_relative_eq!(clock.seconds(), 1.5);
    }

    #[test]
    fn test_scene_time_tracks_delta_between_samples() {
        let time = SceneTime::new();
        time.advance(0.5);
        time.advance(0.75);
        assert_relative_eq!(time.now(), 0.75);
        assert_relative_eq!(time.delta(), 0.25);
        assert_eq!(time.frame(), 2);
    }

    #[test]
    fn test_scene_time_is_readable_from_other_threads() {
        let time = Arc::new(SceneTime::new());
        time.advance(2.0);
        let reader = Arc::clone(&time);
        let seen = std::thread::spawn(move || reader.now())
            .join()
            .expect("reader thread panicked");
        assert_relative_eq!(seen, 2.0);
    }
}
