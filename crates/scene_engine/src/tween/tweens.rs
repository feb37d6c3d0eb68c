//! Concrete tweens
//!
//! Transform tweens address their node by id. If the node is disposed
//! while the tween runs, the tween finishes on its next step without
//! writing and without calling its finish callback.

use crate::foundation::math::{utils, Quat, Vec3};
use crate::scene::scene_graph::{NodeId, SceneGraph};
use crate::scene::SceneError;
use crate::tween::{CancellationToken, Easing, Tween, TweenStatus};

type FinishCallback = Box<dyn FnOnce()>;

/// Start time, duration, curve and completion callback shared by all tweens
struct Timing {
    start: f32,
    duration: f32,
    easing: Easing,
    on_finish: Option<FinishCallback>,
}

impl Timing {
    fn new(duration: f32) -> Self {
        Self {
            start: 0.0,
            duration: duration.max(0.0),
            easing: Easing::Linear,
            on_finish: None,
        }
    }

    /// Eased progress at `now` and whether the end was reached
    fn progress(&self, now: f32) -> (f32, bool) {
        let elapsed = now - self.start;
        if elapsed >= self.duration {
            return (1.0, true);
        }
        (self.easing.apply(elapsed / self.duration), false)
    }

    fn finish(&mut self) -> TweenStatus {
        if let Some(callback) = self.on_finish.take() {
            callback();
        }
        TweenStatus::Finished
    }
}

macro_rules! tween_builders {
    ($tween:ty) => {
        impl $tween {
            /// Set the easing curve, builder style
            #[must_use]
            pub fn with_easing(mut self, easing: Easing) -> Self {
                self.timing.easing = easing;
                self
            }

            /// Replace the cancellation token, builder style
            #[must_use]
            pub fn with_token(mut self, token: Option<CancellationToken>) -> Self {
                self.token = token;
                self
            }

            /// Run `callback` once the end value has been written
            #[must_use]
            pub fn on_finish(mut self, callback: impl FnOnce() + 'static) -> Self {
                self.timing.on_finish = Some(Box::new(callback));
                self
            }
        }
    };
}

/// Drives a scalar through a setter
pub struct FloatTween {
    timing: Timing,
    token: Option<CancellationToken>,
    from: f32,
    to: f32,
    setter: Box<dyn FnMut(&mut SceneGraph, f32)>,
}

impl FloatTween {
    /// Animate from `from` to `to` over `duration` seconds. Holds no token
    /// unless one is given with [`Self::with_token`].
    pub fn new(
        from: f32,
        to: f32,
        duration: f32,
        setter: impl FnMut(&mut SceneGraph, f32) + 'static,
    ) -> Self {
        Self {
            timing: Timing::new(duration),
            token: None,
            from,
            to,
            setter: Box::new(setter),
        }
    }
}

tween_builders!(FloatTween);

impl Tween for FloatTween {
    fn token(&self) -> Option<CancellationToken> {
        self.token
    }

    fn begin(&mut self, now: f32, _graph: &SceneGraph) {
        self.timing.start = now;
    }

    fn step(&mut self, now: f32, graph: &mut SceneGraph) -> TweenStatus {
        let (progress, done) = self.timing.progress(now);
        (self.setter)(graph, utils::lerp(self.from, self.to, progress));
        if done {
            self.timing.finish()
        } else {
            TweenStatus::Running
        }
    }
}

/// Shared body of the transform tweens
fn step_node<T>(
    timing: &mut Timing,
    node: NodeId,
    now: f32,
    graph: &mut SceneGraph,
    write: impl FnOnce(&mut SceneGraph, f32) -> Result<T, SceneError>,
) -> TweenStatus {
    if !graph.contains(node) {
        log::debug!("Tween target {node:?} was disposed; finishing");
        return TweenStatus::Finished;
    }
    let (progress, done) = timing.progress(now);
    if let Err(err) = write(graph, progress) {
        log::warn!("Tween on {node:?} stopped: {err}");
        return TweenStatus::Finished;
    }
    if done {
        timing.finish()
    } else {
        TweenStatus::Running
    }
}

/// Moves a node's world position
pub struct PositionTween {
    timing: Timing,
    token: Option<CancellationToken>,
    node: NodeId,
    from: Option<Vec3>,
    to: Vec3,
}

impl PositionTween {
    /// Move `node` from where it is when the tween starts to `to`
    pub fn new(node: NodeId, to: Vec3, duration: f32) -> Self {
        Self {
            timing: Timing::new(duration),
            token: Some(CancellationToken::Node(node)),
            node,
            from: None,
            to,
        }
    }

    /// Start from `from` instead of the current position, builder style
    #[must_use]
    pub fn from(mut self, from: Vec3) -> Self {
        self.from = Some(from);
        self
    }
}

tween_builders!(PositionTween);

impl Tween for PositionTween {
    fn token(&self) -> Option<CancellationToken> {
        self.token
    }

    fn begin(&mut self, now: f32, graph: &SceneGraph) {
        self.timing.start = now;
        if self.from.is_none() {
            self.from = graph.world_position(self.node).ok();
        }
    }

    fn step(&mut self, now: f32, graph: &mut SceneGraph) -> TweenStatus {
        let (node, to) = (self.node, self.to);
        let from = self.from.unwrap_or(to);
        step_node(&mut self.timing, node, now, graph, |graph, t| {
            graph.set_world_position(node, from.lerp(&to, t))
        })
    }
}

/// Turns a node's world rotation along the shortest arc
pub struct RotationTween {
    timing: Timing,
    token: Option<CancellationToken>,
    node: NodeId,
    from: Option<Quat>,
    to: Quat,
}

impl RotationTween {
    /// Rotate `node` from its rotation when the tween starts to `to`
    pub fn new(node: NodeId, to: Quat, duration: f32) -> Self {
        Self {
            timing: Timing::new(duration),
            token: Some(CancellationToken::Node(node)),
            node,
            from: None,
            to,
        }
    }

    /// Start from `from` instead of the current rotation, builder style
    #[must_use]
    pub fn from(mut self, from: Quat) -> Self {
        self.from = Some(from);
        self
    }
}

tween_builders!(RotationTween);

impl Tween for RotationTween {
    fn token(&self) -> Option<CancellationToken> {
        self.token
    }

    fn begin(&mut self, now: f32, graph: &SceneGraph) {
        self.timing.start = now;
        if self.from.is_none() {
            self.from = graph.world_rotation(self.node).ok();
        }
    }

    fn step(&mut self, now: f32, graph: &mut SceneGraph) -> TweenStatus {
        let (node, to) = (self.node, self.to);
        let from = self.from.unwrap_or(to);
        step_node(&mut self.timing, node, now, graph, |graph, t| {
            // Opposite rotations have no unique arc; snap halfway through
            let rotation = from
                .try_slerp(&to, t, 1.0e-6)
                .unwrap_or(if t < 0.5 { from } else { to });
            graph.set_world_rotation(node, rotation)
        })
    }
}

/// Scales a node's local scale
pub struct ScaleTween {
    timing: Timing,
    token: Option<CancellationToken>,
    node: NodeId,
    from: Option<Vec3>,
    to: Vec3,
}

impl ScaleTween {
    /// Scale `node` from its scale when the tween starts to `to`
    pub fn new(node: NodeId, to: Vec3, duration: f32) -> Self {
        Self {
            timing: Timing::new(duration),
            token: Some(CancellationToken::Node(node)),
            node,
            from: None,
            to,
        }
    }

    /// Start from `from` instead of the current scale, builder style
    #[must_use]
    pub fn from(mut self, from: Vec3) -> Self {
        self.from = Some(from);
        self
    }
}

tween_builders!(ScaleTween);

impl Tween for ScaleTween {
    fn token(&self) -> Option<CancellationToken> {
        self.token
    }

    fn begin(&mut self, now: f32, graph: &SceneGraph) {
        self.timing.start = now;
        if self.from.is_none() {
            self.from = graph.local_scale(self.node).ok();
        }
    }

    fn step(&mut self, now: f32, graph: &mut SceneGraph) -> TweenStatus {
        let (node, to) = (self.node, self.to);
        let from = self.from.unwrap_or(to);
        step_node(&mut self.timing, node, now, graph, |graph, t| {
            graph.set_local_scale(node, from.lerp(&to, t))
        })
    }
}
