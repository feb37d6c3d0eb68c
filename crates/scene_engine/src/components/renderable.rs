//! Renderable components
//!
//! A [`Renderable`] pairs an optional material with a boxed [`Renderer`]
//! that owns the geometry side. [`MeshRenderer`] is the stock renderer: it
//! holds one reference in the geometry cache for as long as it is bound to
//! its mesh, and swapping meshes releases the old reference before
//! acquiring the new one.

use std::sync::Arc;

use crate::physics::collision::BoundingSphere;
use crate::render::{DrawCall, Material, Mesh, MeshHandle, RenderContext, RenderError};
use crate::scene::schema::{unknown_property, Inspect, PropertyDescriptor, PropertyKind, PropertyValue};
use crate::scene::SceneError;

/// Geometry side of a renderable
pub trait Renderer: std::fmt::Debug {
    /// Model-space bounding sphere
    fn bounding_sphere(&self) -> Option<BoundingSphere>;

    /// Take a reference on the GPU geometry
    fn bind(&mut self, ctx: &mut RenderContext) -> Result<(), RenderError>;

    /// Give the GPU geometry reference back
    fn unbind(&mut self, ctx: &mut RenderContext) -> Result<(), RenderError>;

    /// Prepare for drawing this frame
    fn prerender(&mut self, ctx: &mut RenderContext) -> Result<Option<DrawCall>, RenderError>;

    /// Mesh tested by raycasts. Renderers without one are never hit.
    fn mesh(&self) -> Option<&Arc<Mesh>> {
        None
    }

    /// Switch to another mesh, keeping cache references balanced
    fn set_mesh(&mut self, mesh: Arc<Mesh>, _ctx: &mut RenderContext) -> Result<(), RenderError> {
        Err(RenderError::Unsupported {
            what: "mesh swap for renderer",
            value: format!("{self:?} cannot take '{}'", mesh.name()),
        })
    }
}

/// Renderer drawing one shared mesh
#[derive(Debug)]
pub struct MeshRenderer {
    mesh: Arc<Mesh>,
    handle: Option<MeshHandle>,
}

impl MeshRenderer {
    /// Wrap a mesh; fails when the mesh has no bounds
    pub fn new(mesh: Arc<Mesh>) -> Result<Self, RenderError> {
        mesh.require_bounds()?;
        Ok(Self { mesh, handle: None })
    }

    /// Whether the renderer currently holds a cache reference
    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }
}

impl Renderer for MeshRenderer {
    fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.mesh.bounds().map(|bounds| bounds.sphere())
    }

    fn bind(&mut self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        if self.handle.is_none() {
            self.handle = Some(ctx.acquire_mesh(&self.mesh)?);
        }
        Ok(())
    }

    fn unbind(&mut self, ctx: &mut RenderContext) -> Result<(), RenderError> {
        if self.handle.take().is_some() {
            ctx.release_mesh(&self.mesh)?;
        }
        Ok(())
    }

    fn mesh(&self) -> Option<&Arc<Mesh>> {
        Some(&self.mesh)
    }

    /// The same `Arc` is a no-op
    fn set_mesh(&mut self, mesh: Arc<Mesh>, ctx: &mut RenderContext) -> Result<(), RenderError> {
        mesh.require_bounds()?;
        if Arc::ptr_eq(&mesh, &self.mesh) {
            return Ok(());
        }
        let was_bound = self.is_bound();
        self.unbind(ctx)?;
        self.mesh = mesh;
        if was_bound {
            self.bind(ctx)?;
        }
        Ok(())
    }

    fn prerender(&mut self, ctx: &mut RenderContext) -> Result<Option<DrawCall>, RenderError> {
        self.bind(ctx)?;
        let Some(mesh) = self.handle else {
            return Ok(None);
        };
        let count = u32::try_from(self.mesh.element_count()).map_err(|_| {
            RenderError::InvalidMesh(format!("mesh '{}' is too large to draw", self.mesh.name()))
        })?;
        if count == 0 {
            return Ok(None);
        }
        Ok(Some(DrawCall {
            mesh,
            topology: self.mesh.topology(),
            count,
        }))
    }
}

/// Geometry drawn with a material
#[derive(Debug)]
pub struct Renderable {
    material: Option<Arc<Material>>,
    pub(crate) renderer: Box<dyn Renderer>,
    raycastable: bool,
    shadow_caster: bool,
}

impl Renderable {
    /// Mesh renderable using the default material; fails when the mesh has no bounds
    pub fn new(mesh: Arc<Mesh>) -> Result<Self, RenderError> {
        Ok(Self::from_renderer(MeshRenderer::new(mesh)?))
    }

    /// Renderable drawn by a custom renderer
    pub fn from_renderer(renderer: impl Renderer + 'static) -> Self {
        Self {
            material: None,
            renderer: Box::new(renderer),
            raycastable: true,
            shadow_caster: true,
        }
    }

    /// Set the material, builder style
    #[must_use]
    pub fn with_material(mut self, material: Arc<Material>) -> Self {
        self.material = Some(material);
        self
    }

    /// Exclude from raycasts, builder style
    #[must_use]
    pub fn with_raycastable(mut self, raycastable: bool) -> Self {
        self.raycastable = raycastable;
        self
    }

    /// Assigned material; `None` falls back to the scene default
    pub fn material(&self) -> Option<&Arc<Material>> {
        self.material.as_ref()
    }

    pub(crate) fn replace_material(&mut self, material: Option<Arc<Material>>) -> bool {
        let unchanged = match (&self.material, &material) {
            (None, None) => true,
            (Some(current), Some(new)) => Arc::ptr_eq(current, new),
            _ => false,
        };
        if !unchanged {
            self.material = material;
        }
        !unchanged
    }

    /// Mesh of the renderer, if it draws one
    pub fn mesh(&self) -> Option<&Arc<Mesh>> {
        self.renderer.mesh()
    }

    /// The renderer
    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Whether raycasts consider this renderable
    pub fn is_raycastable(&self) -> bool {
        self.raycastable
    }

    /// Include or exclude from raycasts
    pub fn set_raycastable(&mut self, raycastable: bool) {
        self.raycastable = raycastable;
    }

    /// Whether this renderable casts shadows
    pub fn is_shadow_caster(&self) -> bool {
        self.shadow_caster
    }

    /// Toggle shadow casting
    pub fn set_shadow_caster(&mut self, shadow_caster: bool) {
        self.shadow_caster = shadow_caster;
    }
}

static RENDERABLE_SCHEMA: [PropertyDescriptor; 4] = [
    PropertyDescriptor::new("mesh", PropertyKind::Text, "Mesh name (read only)"),
    PropertyDescriptor::new("material", PropertyKind::Text, "Material name (read only)"),
    PropertyDescriptor::new("raycastable", PropertyKind::Bool, "Hit by raycasts"),
    PropertyDescriptor::new("shadow_caster", PropertyKind::Bool, "Casts shadows"),
];

impl Inspect for Renderable {
    fn schema(&self) -> &'static [PropertyDescriptor] {
        &RENDERABLE_SCHEMA
    }

    fn get(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "mesh" => self
                .mesh()
                .map(|mesh| PropertyValue::Text(mesh.name().to_string())),
            "material" => self
                .material
                .as_ref()
                .map(|material| PropertyValue::Text(material.name().to_string())),
            "raycastable" => Some(PropertyValue::Bool(self.raycastable)),
            "shadow_caster" => Some(PropertyValue::Bool(self.shadow_caster)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Result<(), SceneError> {
        match name {
            "raycastable" => self.raycastable = value.as_bool(name)?,
            "shadow_caster" => self.shadow_caster = value.as_bool(name)?,
            "mesh" | "material" => {
                return Err(SceneError::Precondition(format!(
                    "'{name}' must be changed with Scene::set_{name}"
                )))
            }
            _ => return Err(unknown_property("Renderable", name)),
        }
        Ok(())
    }
}
