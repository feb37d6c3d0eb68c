//! Light source component

use crate::foundation::math::{Quat, Vec3};
use crate::scene::component::ComponentId;
use crate::scene::schema::{unknown_property, Inspect, PropertyDescriptor, PropertyKind, PropertyValue};
use crate::scene::SceneError;

/// Kind of light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// Parallel rays along the node's -Z axis
    Directional,
    /// Radiates from the node position
    Point,
}

/// Light component
#[derive(Debug, Clone, PartialEq)]
pub struct LightSource {
    /// Kind of light
    pub kind: LightKind,
    /// Diffuse colour
    pub diffuse: Vec3,
    /// Constant, linear and quadratic attenuation
    pub attenuation: Vec3,
    /// Whether the light casts shadows
    pub cast_shadow: bool,
}

impl LightSource {
    /// White directional light
    pub fn directional() -> Self {
        Self {
            kind: LightKind::Directional,
            diffuse: Vec3::new(1.0, 1.0, 1.0),
            attenuation: Vec3::new(1.0, 0.0, 0.0),
            cast_shadow: false,
        }
    }

    /// White point light
    pub fn point() -> Self {
        Self {
            kind: LightKind::Point,
            attenuation: Vec3::new(1.0, 0.09, 0.032),
            ..Self::directional()
        }
    }

    /// Set the diffuse colour, builder style
    #[must_use]
    pub fn with_diffuse(mut self, diffuse: Vec3) -> Self {
        self.diffuse = diffuse;
        self
    }

    /// Enable shadows, builder style
    #[must_use]
    pub fn with_shadows(mut self, cast_shadow: bool) -> Self {
        self.cast_shadow = cast_shadow;
        self
    }

    pub(crate) fn view(&self, component: ComponentId, position: Vec3, rotation: Quat) -> LightView {
        LightView {
            component,
            kind: self.kind,
            position,
            direction: rotation * -Vec3::z(),
            diffuse: self.diffuse,
            attenuation: self.attenuation,
            cast_shadow: self.cast_shadow,
        }
    }
}

/// Per-frame light state handed to render techniques
#[derive(Debug, Clone, PartialEq)]
pub struct LightView {
    /// The light component
    pub component: ComponentId,
    /// Kind of light
    pub kind: LightKind,
    /// World position
    pub position: Vec3,
    /// World direction the light shines along
    pub direction: Vec3,
    /// Diffuse colour
    pub diffuse: Vec3,
    /// Attenuation terms
    pub attenuation: Vec3,
    /// Shadow flag
    pub cast_shadow: bool,
}

static LIGHT_SCHEMA: [PropertyDescriptor; 4] = [
    PropertyDescriptor::new("kind", PropertyKind::Text, "directional or point"),
    PropertyDescriptor::new("diffuse", PropertyKind::Vec3, "Diffuse colour"),
    PropertyDescriptor::new("attenuation", PropertyKind::Vec3, "Constant, linear, quadratic"),
    PropertyDescriptor::new("cast_shadow", PropertyKind::Bool, "Shadow casting"),
];

impl Inspect for LightSource {
    fn schema(&self) -> &'static [PropertyDescriptor] {
        &LIGHT_SCHEMA
    }

    fn get(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "kind" => Some(PropertyValue::Text(
                match self.kind {
                    LightKind::Directional => "directional",
                    LightKind::Point => "point",
                }
                .to_string(),
            )),
            "diffuse" => Some(PropertyValue::from_vec3(&self.diffuse)),
            "attenuation" => Some(PropertyValue::from_vec3(&self.attenuation)),
            "cast_shadow" => Some(PropertyValue::Bool(self.cast_shadow)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: &PropertyValue) -> Result<(), SceneError> {
        match name {
            "kind" => {
                self.kind = match value.as_text(name)? {
                    "directional" => LightKind::Directional,
                    "point" => LightKind::Point,
                    other => {
                        return Err(SceneError::Unsupported {
                            what: "light kind",
                            value: other.to_string(),
                        })
                    }
                };
            }
            "diffuse" => self.diffuse = value.as_vec3(name)?,
            "attenuation" => self.attenuation = value.as_vec3(name)?,
            "cast_shadow" => self.cast_shadow = value.as_bool(name)?,
            _ => return Err(unknown_property("LightSource", name)),
        }
        Ok(())
    }
}
