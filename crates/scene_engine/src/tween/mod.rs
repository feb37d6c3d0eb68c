//! Time-driven value animation
//!
//! A [`Tween`] interpolates one value between two end points over a fixed
//! duration, sampled once per frame from the scene clock. The
//! [`TweenCollection`] keeps at most one active tween per
//! [`CancellationToken`]: adding a tween cancels whichever tween already
//! holds its token.

pub mod easing;
pub mod tweens;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::scene::scene_graph::{NodeId, SceneGraph};

pub use easing::Easing;
pub use tweens::{FloatTween, PositionTween, RotationTween, ScaleTween};

/// Identity used to cancel tweens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancellationToken {
    /// Transform tweens of a node share this token by default
    Node(NodeId),
    /// Caller-chosen token
    Custom(u64),
}

impl CancellationToken {
    /// Fresh token that no other caller holds
    pub fn unique() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self::Custom(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Whether a tween wants more steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TweenStatus {
    /// Step again next frame
    Running,
    /// Remove from the collection
    Finished,
}

/// A value animation driven by the scene clock
pub trait Tween {
    /// Token this tween holds; `None` never cancels anything
    fn token(&self) -> Option<CancellationToken>;

    /// Called once when the tween is added, with the current scene time
    fn begin(&mut self, now: f32, graph: &SceneGraph);

    /// Advance to `now` and write the value
    fn step(&mut self, now: f32, graph: &mut SceneGraph) -> TweenStatus;
}

/// Active tweens of a scene
#[derive(Default)]
pub struct TweenCollection {
    tweens: Vec<Box<dyn Tween>>,
}

impl TweenCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `tween`, cancelling any tween that shares its token
    pub fn add(&mut self, mut tween: Box<dyn Tween>, now: f32, graph: &SceneGraph) {
        if let Some(token) = tween.token() {
            self.cancel(token);
        }
        tween.begin(now, graph);
        self.tweens.push(tween);
    }

    /// Drop the tween holding `token` before its next step
    pub fn cancel(&mut self, token: CancellationToken) -> bool {
        let Some(index) = self.tweens.iter().rposition(|t| t.token() == Some(token)) else {
            return false;
        };
        self.tweens.remove(index);
        log::trace!("Cancelled tween {token:?}");
        true
    }

    /// Step every tween, newest first, dropping the finished ones
    pub fn update(&mut self, now: f32, graph: &mut SceneGraph) {
        for index in (0..self.tweens.len()).rev() {
            if self.tweens[index].step(now, graph) == TweenStatus::Finished {
                self.tweens.remove(index);
            }
        }
    }

    /// Number of active tweens
    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    /// Whether no tween is active
    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Whether a tween holds `token`
    pub fn contains(&self, token: CancellationToken) -> bool {
        self.tweens.iter().any(|t| t.token() == Some(token))
    }

    /// Drop every tween without finishing it
    pub fn clear(&mut self) {
        self.tweens.clear();
    }
}

impl std::fmt::Debug for TweenCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TweenCollection")
            .field("active", &self.tweens.len())
            .finish()
    }
}
