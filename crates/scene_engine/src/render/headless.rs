//! Command-recording backend
//!
//! Implements [`GpuBackend`] without a GPU. Every call is appended to a
//! command list, which makes it the backend of choice for tests and for
//! running a scene on a server.

use std::any::Any;
use std::collections::HashMap;

use crate::components::{CameraView, LightView};
use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::{
    BackendResult, DrawCall, GpuBackend, Material, Mesh, MeshHandle, RenderError, ShaderId,
};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// A mesh was uploaded
    UploadMesh {
        /// Handle handed out
        handle: MeshHandle,
        /// Mesh name
        name: String,
    },
    /// A mesh upload was freed
    ReleaseMesh(MeshHandle),
    /// Targets were cleared
    Clear {
        /// Clear colour, if the colour target was cleared
        color: Option<Vec4>,
        /// Whether depth was cleared
        depth: bool,
    },
    /// Camera uniforms were set
    SetCamera {
        /// Camera order
        order: i32,
        /// Camera world position
        position: Vec3,
    },
    /// Light uniforms were set
    SetLights(usize),
    /// A material was bound
    BindMaterial {
        /// Material name
        name: String,
        /// Shader program
        shader: ShaderId,
    },
    /// A model matrix was set
    SetModelMatrix(Mat4),
    /// A draw was issued
    Draw(DrawCall),
    /// The frame was presented
    Present,
}

/// Backend that records instead of rendering
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    live: HashMap<MeshHandle, String>,
    commands: Vec<BackendCommand>,
    uploads: usize,
    releases: usize,
}

impl HeadlessBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command recorded since creation or the last [`Self::clear_commands`]
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Forget recorded commands; counters are kept
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Draws recorded so far, in order
    pub fn draws(&self) -> Vec<DrawCall> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                BackendCommand::Draw(call) => Some(*call),
                _ => None,
            })
            .collect()
    }

    /// Total number of uploads
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    /// Total number of releases
    pub fn release_count(&self) -> usize {
        self.releases
    }

    /// Uploads not yet released
    pub fn live_mesh_count(&self) -> usize {
        self.live.len()
    }
}

impl GpuBackend for HeadlessBackend {
    fn upload_mesh(&mut self, mesh: &Mesh) -> BackendResult<MeshHandle> {
        mesh.validate()?;
        self.next_handle += 1;
        let handle = MeshHandle(self.next_handle);
        self.live.insert(handle, mesh.name().to_string());
        self.uploads += 1;
        self.commands.push(BackendCommand::UploadMesh {
            handle,
            name: mesh.name().to_string(),
        });
        Ok(handle)
    }

    fn release_mesh(&mut self, handle: MeshHandle) -> BackendResult<()> {
        if self.live.remove(&handle).is_none() {
            return Err(RenderError::Backend(format!("mesh handle {} is not live", handle.0)));
        }
        self.releases += 1;
        self.commands.push(BackendCommand::ReleaseMesh(handle));
        Ok(())
    }

    fn clear(&mut self, color: Option<Vec4>, depth: bool) -> BackendResult<()> {
        self.commands.push(BackendCommand::Clear { color, depth });
        Ok(())
    }

    fn set_camera(&mut self, camera: &CameraView) {
        self.commands.push(BackendCommand::SetCamera {
            order: camera.order,
            position: camera.position,
        });
    }

    fn set_lights(&mut self, lights: &[LightView]) {
        self.commands.push(BackendCommand::SetLights(lights.len()));
    }

    fn bind_material(&mut self, material: &Material) -> BackendResult<()> {
        self.commands.push(BackendCommand::BindMaterial {
            name: material.name().to_string(),
            shader: material.shader(),
        });
        Ok(())
    }

    fn set_model_matrix(&mut self, model: &Mat4) {
        self.commands.push(BackendCommand::SetModelMatrix(*model));
    }

    fn draw(&mut self, call: &DrawCall) -> BackendResult<()> {
        if !self.live.contains_key(&call.mesh) {
            return Err(RenderError::Backend(format!(
                "draw with released mesh handle {}",
                call.mesh.0
            )));
        }
        self.commands.push(BackendCommand::Draw(*call));
        Ok(())
    }

    fn present(&mut self) -> BackendResult<()> {
        self.commands.push(BackendCommand::Present);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
