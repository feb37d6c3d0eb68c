//! Scene management system
//!
//! Owns the node hierarchy and the components attached to it, and runs
//! them frame by frame.
//!
//! ## Architecture
//!
//! ```text
//! Scene (lifecycle, indexes, frame loop)
//!   ├── SceneGraph (nodes, lazy world transforms)
//!   ├── Component arena (cameras, lights, renderables, colliders, behaviours)
//!   ├── TweenCollection
//!   └── RenderContext → RenderTechnique → GpuBackend
//! ```

pub mod component;
pub mod error;
pub mod frame_stats;
pub mod layer;
pub mod render_queue;
pub mod scene_graph;
pub mod scene_manager;
pub mod schema;
pub mod transform;

#[cfg(test)]
mod tests;

pub use component::{Behaviour, ComponentContext, ComponentId, ComponentKind, ComponentState};
pub use error::SceneError;
pub use frame_stats::FrameStats;
pub use layer::{Capabilities, Layer};
pub use render_queue::{RenderItem, RenderableCollection};
pub use scene_graph::{Node, NodeId, SceneGraph, SceneId};
pub use scene_manager::Scene;
pub use schema::{
    ComponentSnapshot, Inspect, NodeSnapshot, PropertyDescriptor, PropertyKind, PropertyValue,
    SceneSnapshot,
};
pub use transform::NodeTransform;
