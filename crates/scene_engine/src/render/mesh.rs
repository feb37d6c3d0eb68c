//! Mesh data
//!
//! CPU-side geometry handed to the GPU backend for upload and walked by the
//! raycaster's narrow phase. Meshes are shared as `Arc<Mesh>`; the pointer
//! is the mesh's identity for the geometry cache, so two meshes with equal
//! contents are still two cache entries.

use std::str::FromStr;

use crate::foundation::math::{Vec2, Vec3, Vec4};
use crate::physics::collision::{BoundingSphere, Triangle};
use crate::render::RenderError;

/// How vertices are assembled into primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    /// One point per vertex
    Points,
    /// One segment per vertex pair
    Lines,
    /// One triangle per vertex triple
    Triangles,
}

impl PrimitiveTopology {
    /// Vertices consumed per primitive
    pub fn vertices_per_primitive(self) -> usize {
        match self {
            Self::Points => 1,
            Self::Lines => 2,
            Self::Triangles => 3,
        }
    }
}

impl FromStr for PrimitiveTopology {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "points" => Ok(Self::Points),
            "lines" => Ok(Self::Lines),
            "triangles" => Ok(Self::Triangles),
            _ => Err(RenderError::Unsupported {
                what: "primitive topology",
                value: s.to_string(),
            }),
        }
    }
}

/// Width of one index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit indices
    U16,
    /// 32-bit indices
    U32,
}

impl IndexFormat {
    /// Format from the size of one index in bytes
    pub fn from_byte_width(bytes: usize) -> Result<Self, RenderError> {
        match bytes {
            2 => Ok(Self::U16),
            4 => Ok(Self::U32),
            other => Err(RenderError::Unsupported {
                what: "index format",
                value: format!("{other}-byte indices"),
            }),
        }
    }

    /// Size of one index in bytes
    pub fn byte_width(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Index buffer of either width
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuffer {
    /// 16-bit indices
    U16(Vec<u16>),
    /// 32-bit indices
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Number of indices
    pub fn len(&self) -> usize {
        match self {
            Self::U16(indices) => indices.len(),
            Self::U32(indices) => indices.len(),
        }
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index at `position`, widened
    pub fn get(&self, position: usize) -> Option<usize> {
        match self {
            Self::U16(indices) => indices.get(position).map(|&i| usize::from(i)),
            Self::U32(indices) => indices.get(position).and_then(|&i| usize::try_from(i).ok()),
        }
    }

    /// Width of the stored indices
    pub fn format(&self) -> IndexFormat {
        match self {
            Self::U16(_) => IndexFormat::U16,
            Self::U32(_) => IndexFormat::U32,
        }
    }

    fn max_index(&self) -> Option<usize> {
        (0..self.len()).filter_map(|i| self.get(i)).max()
    }
}

/// Precomputed bounds of a mesh in model space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    /// Center of the axis-aligned box
    pub center: Vec3,
    /// Half size of the axis-aligned box
    pub half_extents: Vec3,
    /// Radius of the sphere around `center` enclosing every vertex
    pub radius: f32,
}

impl BoundingVolume {
    /// Sphere around the same center
    pub fn sphere(&self) -> BoundingSphere {
        BoundingSphere::new(self.center, self.radius)
    }
}

/// Vertex and index data of one drawable
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    name: String,
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    tangents: Option<Vec<Vec3>>,
    uvs: Option<Vec<Vec2>>,
    colors: Option<Vec<Vec4>>,
    indices: Option<IndexBuffer>,
    topology: PrimitiveTopology,
    bounds: Option<BoundingVolume>,
}

impl Mesh {
    /// Create a mesh from positions. Bounds are not computed until asked.
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, topology: PrimitiveTopology) -> Self {
        Self {
            name: name.into(),
            positions,
            normals: None,
            tangents: None,
            uvs: None,
            colors: None,
            indices: None,
            topology,
            bounds: None,
        }
    }

    /// Attach per-vertex normals
    #[must_use]
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Attach per-vertex tangents
    #[must_use]
    pub fn with_tangents(mut self, tangents: Vec<Vec3>) -> Self {
        self.tangents = Some(tangents);
        self
    }

    /// Attach per-vertex texture coordinates
    #[must_use]
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Attach per-vertex colours
    #[must_use]
    pub fn with_colors(mut self, colors: Vec<Vec4>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Attach an index buffer
    #[must_use]
    pub fn with_indices(mut self, indices: IndexBuffer) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Use explicit bounds instead of computing them
    #[must_use]
    pub fn with_bounds(mut self, bounds: BoundingVolume) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Compute bounds and return the mesh, builder style
    pub fn with_calculated_bounds(mut self) -> Result<Self, RenderError> {
        self.calculate_bounds()?;
        Ok(self)
    }

    /// Compute the bounding box center and the enclosing sphere radius
    pub fn calculate_bounds(&mut self) -> Result<BoundingVolume, RenderError> {
        let Some(first) = self.positions.first() else {
            return Err(RenderError::InvalidMesh(format!(
                "mesh '{}' has no vertices to bound",
                self.name
            )));
        };
        let (min, max) = self
            .positions
            .iter()
            .fold((*first, *first), |(min, max), p| (min.inf(p), max.sup(p)));
        let center = (min + max) * 0.5;
        let radius = self
            .positions
            .iter()
            .map(|p| (p - center).norm())
            .fold(0.0_f32, f32::max);

        let bounds = BoundingVolume {
            center,
            half_extents: (max - min) * 0.5,
            radius,
        };
        self.bounds = Some(bounds);
        Ok(bounds)
    }

    /// Check attribute lengths and index ranges
    pub fn validate(&self) -> Result<(), RenderError> {
        let count = self.positions.len();
        let attribute_lengths = [
            ("normals", self.normals.as_ref().map(Vec::len)),
            ("tangents", self.tangents.as_ref().map(Vec::len)),
            ("uvs", self.uvs.as_ref().map(Vec::len)),
            ("colors", self.colors.as_ref().map(Vec::len)),
        ];
        for (attribute, len) in attribute_lengths {
            if let Some(len) = len.filter(|&len| len != count) {
                return Err(RenderError::InvalidMesh(format!(
                    "mesh '{}' has {len} {attribute} for {count} positions",
                    self.name
                )));
            }
        }
        if let Some(max) = self.indices.as_ref().and_then(IndexBuffer::max_index) {
            if max >= count {
                return Err(RenderError::InvalidMesh(format!(
                    "mesh '{}' indexes vertex {max} of {count}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertex positions
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Vertex normals
    pub fn normals(&self) -> Option<&[Vec3]> {
        self.normals.as_deref()
    }

    /// Vertex tangents
    pub fn tangents(&self) -> Option<&[Vec3]> {
        self.tangents.as_deref()
    }

    /// Texture coordinates
    pub fn uvs(&self) -> Option<&[Vec2]> {
        self.uvs.as_deref()
    }

    /// Vertex colours
    pub fn colors(&self) -> Option<&[Vec4]> {
        self.colors.as_deref()
    }

    /// Index buffer, if the mesh is indexed
    pub fn indices(&self) -> Option<&IndexBuffer> {
        self.indices.as_ref()
    }

    /// Primitive topology
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Bounds, if computed or supplied
    pub fn bounds(&self) -> Option<&BoundingVolume> {
        self.bounds.as_ref()
    }

    /// Bounds, or [`RenderError::MissingBounds`]
    pub fn require_bounds(&self) -> Result<&BoundingVolume, RenderError> {
        self.bounds
            .as_ref()
            .ok_or_else(|| RenderError::MissingBounds(self.name.clone()))
    }

    /// Number of indices, or vertices for non-indexed meshes
    pub fn element_count(&self) -> usize {
        self.indices.as_ref().map_or(self.positions.len(), IndexBuffer::len)
    }

    /// Triangles of a triangle-list mesh; empty for other topologies.
    /// Triangles referencing missing vertices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        let count = if self.topology == PrimitiveTopology::Triangles {
            self.element_count() / 3
        } else {
            0
        };
        (0..count).filter_map(move |i| {
            let vertex = |corner: usize| {
                let element = i * 3 + corner;
                let index = match &self.indices {
                    Some(indices) => indices.get(element)?,
                    None => element,
                };
                self.positions.get(index).copied()
            };
            Some(Triangle::new(vertex(0)?, vertex(1)?, vertex(2)?))
        })
    }
}
