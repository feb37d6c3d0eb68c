//! Rendering interfaces
//!
//! The scene never talks to a graphics API directly. It drives a
//! [`GpuBackend`] through a pluggable [`RenderTechnique`], and shares
//! uploaded geometry between renderers through the [`GeometryCache`].
//! Both live in a [`RenderContext`] that the scene owns and passes down
//! explicitly.

pub mod backend;
pub mod frustum;
pub mod geometry_cache;
pub mod headless;
pub mod material;
pub mod mesh;
pub mod technique;

use std::sync::Arc;

pub use backend::{BackendResult, DrawCall, GpuBackend, MeshHandle};
pub use frustum::{Frustum, Plane};
pub use geometry_cache::GeometryCache;
pub use headless::{BackendCommand, HeadlessBackend};
pub use material::{Material, RenderBucket, RenderQueue, ShaderId};
pub use mesh::{BoundingVolume, IndexBuffer, IndexFormat, Mesh, PrimitiveTopology};
pub use technique::{ForwardTechnique, RenderTechnique};

/// Rendering errors
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// A mesh was used for rendering or raycasting without bounds
    #[error("Mesh '{0}' has no bounding volume")]
    MissingBounds(String),

    /// Mesh data is inconsistent
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// A geometry release had no matching acquire
    #[error("Unbalanced geometry release: {0}")]
    UnbalancedRelease(String),

    /// The backend reported a failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Data named a topology, index format or queue the engine does not know
    #[error("Unsupported {what}: {value}")]
    Unsupported {
        /// Category of the rejected value
        what: &'static str,
        /// The rejected value
        value: String,
    },
}

/// GPU backend plus the geometry shared on it
pub struct RenderContext {
    backend: Box<dyn GpuBackend>,
    geometry: GeometryCache,
}

impl RenderContext {
    /// Wrap a backend with an empty geometry cache
    pub fn new(backend: Box<dyn GpuBackend>) -> Self {
        Self {
            backend,
            geometry: GeometryCache::new(),
        }
    }

    /// The backend
    pub fn backend(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    /// The backend, mutably
    pub fn backend_mut(&mut self) -> &mut dyn GpuBackend {
        self.backend.as_mut()
    }

    /// The geometry cache
    pub fn geometry(&self) -> &GeometryCache {
        &self.geometry
    }

    /// Bind one more user to `mesh`, uploading it on first use
    pub fn acquire_mesh(&mut self, mesh: &Arc<Mesh>) -> Result<MeshHandle, RenderError> {
        self.geometry.acquire(self.backend.as_mut(), mesh)
    }

    /// Drop one user of `mesh`, freeing the upload with the last one
    pub fn release_mesh(&mut self, mesh: &Arc<Mesh>) -> Result<(), RenderError> {
        self.geometry.release(self.backend.as_mut(), mesh)
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}
