//! Materials and render queue classification

use std::str::FromStr;

use crate::foundation::math::Vec4;
use crate::render::RenderError;

/// Identity of a compiled shader program; the opaque sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ShaderId(pub u32);

/// Render queue tag carried by a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderQueue {
    /// Depth-tested, drawn grouped by shader
    #[default]
    Opaque,
    /// Alpha blended, drawn back to front
    Transparent,
    /// Opaque geometry with a user shader; sorted with the opaque bucket
    CustomShaderOpaque,
}

/// Which list of the renderable collection a queue lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderBucket {
    /// Shader-sorted list
    Opaque,
    /// Distance-sorted list
    Transparent,
}

impl RenderQueue {
    /// Bucket this queue is partitioned into
    pub fn bucket(self) -> RenderBucket {
        match self {
            Self::Opaque | Self::CustomShaderOpaque => RenderBucket::Opaque,
            Self::Transparent => RenderBucket::Transparent,
        }
    }
}

impl FromStr for RenderQueue {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "opaque" => Ok(Self::Opaque),
            "transparent" => Ok(Self::Transparent),
            "custom_shader_opaque" | "customshaderopaque" => Ok(Self::CustomShaderOpaque),
            _ => Err(RenderError::Unsupported {
                what: "render queue",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<u8> for RenderQueue {
    type Error = RenderError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Opaque),
            1 => Ok(Self::Transparent),
            2 => Ok(Self::CustomShaderOpaque),
            other => Err(RenderError::Unsupported {
                what: "render queue",
                value: other.to_string(),
            }),
        }
    }
}

/// Surface description bound before drawing
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    name: String,
    shader: ShaderId,
    queue: RenderQueue,
    color: Vec4,
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default", ShaderId(0))
    }
}

impl Material {
    /// Create an opaque white material
    pub fn new(name: impl Into<String>, shader: ShaderId) -> Self {
        Self {
            name: name.into(),
            shader,
            queue: RenderQueue::Opaque,
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
        }
    }

    /// Set the render queue, builder style
    #[must_use]
    pub fn with_queue(mut self, queue: RenderQueue) -> Self {
        self.queue = queue;
        self.color = self.normalized_color(self.color);
        self
    }

    /// Set the colour, builder style. Opaque materials force alpha to 1.
    #[must_use]
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = self.normalized_color(color);
        self
    }

    fn normalized_color(&self, mut color: Vec4) -> Vec4 {
        if self.queue.bucket() == RenderBucket::Opaque {
            color.w = 1.0;
        }
        color
    }

    /// Material name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shader program
    pub fn shader(&self) -> ShaderId {
        self.shader
    }

    /// Render queue tag
    pub fn queue(&self) -> RenderQueue {
        self.queue
    }

    /// Base colour
    pub fn color(&self) -> Vec4 {
        self.color
    }
}
