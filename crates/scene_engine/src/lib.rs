//! # Scene Engine
//!
//! A real-time 3D scene graph with a component lifecycle, lazy world
//! transforms, shared GPU geometry and two-phase raycasting.
//!
//! ## Features
//!
//! - **Scene Graph**: Parent/child hierarchy with cached world matrices
//! - **Components**: Cameras, lights, mesh renderables, colliders and user behaviours
//! - **Rendering**: Pluggable techniques over an abstract GPU backend
//! - **Raycasting**: Bounding-sphere broad phase with nearest-hit pruning
//! - **Tweens**: Eased position, rotation, scale and scalar animation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), SceneError> {
//!     let mut scene = Scene::new(SceneConfig::default(), Box::new(HeadlessBackend::new()));
//!
//!     let camera = scene.create_node("camera");
//!     scene.graph_mut().set_local_position(camera, Vec3::new(0.0, 0.0, 5.0))?;
//!     scene.add_component(camera, Camera::new())?;
//!
//!     let light = scene.create_node("sun");
//!     scene.add_component(light, LightSource::directional())?;
//!
//!     for _ in 0..3 {
//!         scene.frame()?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod components;
pub mod config;
pub mod foundation;
pub mod physics;
pub mod render;
pub mod scene;
pub mod tween;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        components::{Camera, Collider, LightSource, Renderable, ProjectionKind},
        config::{Config, SceneConfig},
        foundation::{
            math::{Quat, Vec2, Vec3, Vec4, Mat4, Transform},
            time::{ManualClock, MonotonicClock, TimeSource},
        },
        physics::{Ray, RaycastHit, RaycastMode, RaycastResult},
        render::{GpuBackend, HeadlessBackend, Material, Mesh, RenderError},
        scene::{
            Behaviour, ComponentContext, ComponentId, Layer, NodeId, Scene, SceneError,
        },
        tween::{CancellationToken, Easing, FloatTween, PositionTween, RotationTween, ScaleTween},
    };
}
