//! Built-in components
//!
//! Plain data types wrapped by [`crate::scene::ComponentKind`]. Each one
//! exposes its properties through [`crate::scene::Inspect`].

pub mod camera;
pub mod collider;
pub mod light;
pub mod renderable;

pub use camera::{Camera, CameraView, ProjectionKind};
pub use collider::{Collider, ColliderShape};
pub use light::{LightKind, LightSource, LightView};
pub use renderable::{MeshRenderer, Renderable, Renderer};
