//! Camera component
//!
//! A camera looks down its node's local -Z axis. Its view matrix is the
//! inverse of the node's world matrix; the projection comes from the
//! settings below and the screen aspect ratio.

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec2, Vec3, Vec4};
use crate::physics::collision::Ray;
use crate::scene::component::ComponentId;
use crate::scene::schema::{unknown_property, Inspect, PropertyDescriptor, PropertyKind, PropertyValue};
use crate::scene::{Layer, SceneError};

/// Projection model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionKind {
    /// Field-of-view based
    Perspective,
    /// Parallel projection of a fixed height
    Orthographic,
}

/// Viewpoint component
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    order: i32,
    projection: ProjectionKind,
    fov_y: f32,
    ortho_size: f32,
    near: f32,
    far: f32,
    clear_color: Vec4,
    ambient: Vec3,
    layer: Layer,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    /// Perspective camera with a 60° vertical field of view
    pub fn new() -> Self {
        Self {
            order: 0,
            projection: ProjectionKind::Perspective,
            fov_y: utils::deg_to_rad(60.0),
            ortho_size: 10.0,
            near: 0.1,
            far: 100.0,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            ambient: Vec3::new(0.2, 0.2, 0.2),
            layer: Layer::ALL,
        }
    }

    /// Orthographic camera showing `size` world units vertically
    pub fn orthographic(size: f32) -> Result<Self, SceneError> {
        let mut camera = Self::new();
        camera.projection = ProjectionKind::Orthographic;
        camera.set_ortho_size(size)?;
        Ok(camera)
    }

    /// Set the order, builder style
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Set the clear colour, builder style
    #[must_use]
    pub fn with_clear_color(mut self, color: Vec4) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the ambient light, builder style
    #[must_use]
    pub fn with_ambient(mut self, ambient: Vec3) -> Self {
        self.ambient = ambient;
        self
    }

    /// Restrict rendering to `layer`, builder style
    #[must_use]
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    /// Sorting key; lower orders render first
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Change the sorting key
    pub fn set_order(&mut self, order: i32) {
        self.order = order;
    }

    /// Projection model
    pub fn projection(&self) -> ProjectionKind {
        self.projection
    }

    /// Switch projection model
    pub fn set_projection(&mut self, projection: ProjectionKind) {
        self.projection = projection;
    }

    /// Vertical field of view in radians
    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    /// Set the field of view; must lie in (0, π]
    pub fn set_fov_y(&mut self, fov_y: f32) -> Result<(), SceneError> {
        if !(fov_y > 0.0 && fov_y <= std::f32::consts::PI) {
            return Err(SceneError::Precondition(format!(
                "field of view {fov_y} is outside (0, π]"
            )));
        }
        self.fov_y = fov_y;
        Ok(())
    }

    /// Height of the orthographic view volume
    pub fn ortho_size(&self) -> f32 {
        self.ortho_size
    }

    /// Set the orthographic height; must be positive
    pub fn set_ortho_size(&mut self, size: f32) -> Result<(), SceneError> {
        if size <= 0.0 || !size.is_finite() {
            return Err(SceneError::Precondition(format!(
                "orthographic size {size} must be positive"
            )));
        }
        self.ortho_size = size;
        Ok(())
    }

    /// Near and far clip distances
    pub fn clip_planes(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    /// Set clip distances; requires `0 < near < far`
    pub fn set_clip_planes(&mut self, near: f32, far: f32) -> Result<(), SceneError> {
        if !(near > 0.0 && far > near) {
            return Err(SceneError::Precondition(format!(
                "clip planes near={near} far={far} must satisfy 0 < near < far"
            )));
        }
        self.near = near;
        self.far = far;
        Ok(())
    }

    /// Colour the first camera of a frame clears to
    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    /// Set the clear colour
    pub fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }

    /// Ambient light term
    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    /// Layers this camera renders
    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// Projection matrix for the given aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        match self.projection {
            ProjectionKind::Perspective => Mat4::perspective(self.fov_y, aspect, self.near, self.far),
            ProjectionKind::Orthographic => Mat4::orthographic(self.ortho_size, aspect, self.near, self.far),
        }
    }

    pub(crate) fn view(
        &self,
        component: ComponentId,
        world: &Mat4,
        view: Mat4,
        aspect: f32,
    ) -> CameraView {
        let projection = self.projection_matrix(aspect);
        CameraView {
            component,
            order: self.order,
            position: utils::translation_of(world),
            view,
            projection,
            view_projection: projection * view,
            clear_color: self.clear_color,
            ambient: self.ambient,
            layer: self.layer,
        }
    }
}

/// Per-frame camera state handed to render techniques
#[derive(Debug, Clone, PartialEq)]
pub struct CameraView {
    /// The camera component
    pub component: ComponentId,
    /// Sorting key
    pub order: i32,
    /// World position
    pub position: Vec3,
    /// World-to-view matrix
    pub view: Mat4,
    /// View-to-clip matrix
    pub projection: Mat4,
    /// `projection * view`
    pub view_projection: Mat4,
    /// Clear colour
    pub clear_color: Vec4,
    /// Ambient light term
    pub ambient: Vec3,
    /// Layers rendered
    pub layer: Layer,
}

impl CameraView {
    /// World-space ray through a pixel; `(0, 0)` is the top-left corner
    #[allow(clippy::cast_precision_loss)]
    pub fn screen_ray(&self, screen: Vec2, screen_size: (u32, u32)) -> Option<Ray> {
        let (width, height) = screen_size;
        if width == 0 || height == 0 {
            return None;
        }
        let ndc_x = 2.0 * screen.x / width as f32 - 1.0;
        let ndc_y = 1.0 - 2.0 * screen.y / height as f32;

        let inverse = self.view_projection.try_inverse()?;
        let unproject = |depth: f32| {
            let clip = inverse * Vec4::new(ndc_x, ndc_y, depth, 1.0);
            (clip.w.abs() > f32::EPSILON).then(|| clip.xyz() / clip.w)
        };
        let near = unproject(-1.0)?;
        let far = unproject(1.0)?;
        Ray::new(near, far - near).ok()
    }
}

static CAMERA_SCHEMA: [PropertyDescriptor; 9] = [
    PropertyDescriptor::new("order", PropertyKind::Int, "Render order, ascending"),
    PropertyDescriptor::new("projection", PropertyKind::Text, "perspective or orthographic"),
    PropertyDescriptor::new("fov_y", PropertyKind::Float, "Vertical field of view in radians"),
    PropertyDescriptor::new("ortho_size", PropertyKind::Float, "Orthographic view height"),
    PropertyDescriptor::new("near", PropertyKind::Float, "Near clip distance"),
    PropertyDescriptor::new("far", PropertyKind::Float, "Far clip distance"),
    PropertyDescriptor::new("clear_color", PropertyKind::Vec4, "Clear colour"),
    PropertyDescriptor::new("ambient", PropertyKind::Vec3, "Ambient light"),
    PropertyDescriptor::new("layer", PropertyKind::Int, "Rendered layer bits"),
];

impl Inspect for Camera {
    fn schema(&self) -> &'static [PropertyDescriptor] {
        &CAMERA_SCHEMA
    }

    fn get(&self, name: &str) -> Option<PropertyValue> {
        let value = match name {
            "order" => PropertyValue::Int(i64::from(self.order)),
            "projection" => PropertyValue::Text(
                match self.projection {
                    ProjectionKind::Perspective => "perspective",
                    ProjectionKind::Orthographic => "orthographic",
                }
                .to_string(),
            ),
            "fov_y" => PropertyValue::Float(self.fov_y),
            "ortho_size" => PropertyValue::Float(self.ortho_size),
            "near" => PropertyValue::Float(self.near),
            "far" => PropertyValue::Float(self.far),
            "clear_color" => PropertyValue::from_vec4(&self.clear_color),
            "ambient" => PropertyValue::from_vec3(&self.ambient),
            "layer" => PropertyValue::Int(i64::from(self.layer.bits())),
            _ => return None,
        };
        Some(value)
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Result<(), SceneError> {
        match name {
            "order" => {
                self.order = i32::try_from(value.as_int(name)?)
                    .map_err(|_| SceneError::Precondition("camera order out of range".into()))?;
            }
            "projection" => {
                self.projection = match value.as_text(name)? {
                    "perspective" => ProjectionKind::Perspective,
                    "orthographic" => ProjectionKind::Orthographic,
                    other => {
                        return Err(SceneError::Unsupported {
                            what: "projection",
                            value: other.to_string(),
                        })
                    }
                };
            }
            "fov_y" => self.set_fov_y(value.as_float(name)?)?,
            "ortho_size" => self.set_ortho_size(value.as_float(name)?)?,
            "near" => self.set_clip_planes(value.as_float(name)?, self.far)?,
            "far" => self.set_clip_planes(self.near, value.as_float(name)?)?,
            "clear_color" => self.clear_color = value.as_vec4(name)?,
            "ambient" => self.ambient = value.as_vec3(name)?,
            "layer" => {
                let bits = u32::try_from(value.as_int(name)?)
                    .map_err(|_| SceneError::Precondition("layer bits out of range".into()))?;
                self.layer = Layer::from_bits_retain(bits);
            }
            _ => return Err(unknown_property("Camera", name)),
        }
        Ok(())
    }
}
