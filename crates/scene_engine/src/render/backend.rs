//! Backend abstraction for the rendering system
//!
//! This module defines the trait a graphics API binding implements so the
//! scene and its render techniques can drive it without knowing the API.

use std::any::Any;

use crate::components::{CameraView, LightView};
use crate::foundation::math::{Mat4, Vec4};
use crate::render::{Material, Mesh, PrimitiveTopology, RenderError};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Handle to uploaded mesh buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Everything needed to issue one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Uploaded geometry
    pub mesh: MeshHandle,
    /// How to assemble it
    pub topology: PrimitiveTopology,
    /// Number of indices (or vertices when not indexed)
    pub count: u32,
}

/// Graphics API binding used by render techniques
pub trait GpuBackend {
    /// Upload vertex, index and attribute data
    fn upload_mesh(&mut self, mesh: &Mesh) -> BackendResult<MeshHandle>;

    /// Free buffers created by [`GpuBackend::upload_mesh`]
    fn release_mesh(&mut self, handle: MeshHandle) -> BackendResult<()>;

    /// Clear the colour target (when `color` is set) and optionally depth
    fn clear(&mut self, color: Option<Vec4>, depth: bool) -> BackendResult<()>;

    /// Upload camera uniforms
    fn set_camera(&mut self, camera: &CameraView);

    /// Upload light uniforms
    fn set_lights(&mut self, lights: &[LightView]);

    /// Bind shader and material uniforms
    fn bind_material(&mut self, material: &Material) -> BackendResult<()>;

    /// Set the model matrix for the next draw
    fn set_model_matrix(&mut self, model: &Mat4);

    /// Draw uploaded geometry
    fn draw(&mut self, call: &DrawCall) -> BackendResult<()>;

    /// Finish and display the frame
    fn present(&mut self) -> BackendResult<()>;

    /// Get reference to self as Any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Get mutable reference to self as Any for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
