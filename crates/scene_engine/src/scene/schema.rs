//! Property schema and scene snapshots
//!
//! Each built-in component type publishes a static table of
//! [`PropertyDescriptor`]s and implements [`Inspect`] to read and write those
//! properties by name. [`SceneSnapshot`] is the serializable view a
//! persistence layer or an editor works from; choosing a file format is left
//! to the caller (the snapshot is plain serde data).

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Vec3, Vec4};
use crate::scene::SceneError;

/// Value type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// `bool`
    Bool,
    /// Signed integer
    Int,
    /// `f32`
    Float,
    /// Three-component vector
    Vec3,
    /// Four-component vector or colour
    Vec4,
    /// Free-form or enumerated text
    Text,
}

/// A property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// `bool`
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// `f32`
    Float(f32),
    /// Three-component vector
    Vec3([f32; 3]),
    /// Four-component vector or colour
    Vec4([f32; 4]),
    /// Text
    Text(String),
}

impl PropertyValue {
    /// Kind of this value
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Bool(_) => PropertyKind::Bool,
            Self::Int(_) => PropertyKind::Int,
            Self::Float(_) => PropertyKind::Float,
            Self::Vec3(_) => PropertyKind::Vec3,
            Self::Vec4(_) => PropertyKind::Vec4,
            Self::Text(_) => PropertyKind::Text,
        }
    }

    pub(crate) fn from_vec3(v: &Vec3) -> Self {
        Self::Vec3([v.x, v.y, v.z])
    }

    pub(crate) fn from_vec4(v: &Vec4) -> Self {
        Self::Vec4([v.x, v.y, v.z, v.w])
    }

    pub(crate) fn as_bool(&self, name: &str) -> Result<bool, SceneError> {
        match self {
            Self::Bool(value) => Ok(*value),
            other => Err(mismatch(name, PropertyKind::Bool, other)),
        }
    }

    pub(crate) fn as_int(&self, name: &str) -> Result<i64, SceneError> {
        match self {
            Self::Int(value) => Ok(*value),
            other => Err(mismatch(name, PropertyKind::Int, other)),
        }
    }

    pub(crate) fn as_float(&self, name: &str) -> Result<f32, SceneError> {
        match self {
            Self::Float(value) => Ok(*value),
            other => Err(mismatch(name, PropertyKind::Float, other)),
        }
    }

    pub(crate) fn as_vec3(&self, name: &str) -> Result<Vec3, SceneError> {
        match self {
            Self::Vec3([x, y, z]) => Ok(Vec3::new(*x, *y, *z)),
            other => Err(mismatch(name, PropertyKind::Vec3, other)),
        }
    }

    pub(crate) fn as_vec4(&self, name: &str) -> Result<Vec4, SceneError> {
        match self {
            Self::Vec4([x, y, z, w]) => Ok(Vec4::new(*x, *y, *z, *w)),
            other => Err(mismatch(name, PropertyKind::Vec4, other)),
        }
    }

    pub(crate) fn as_text(&self, name: &str) -> Result<&str, SceneError> {
        match self {
            Self::Text(value) => Ok(value),
            other => Err(mismatch(name, PropertyKind::Text, other)),
        }
    }
}

fn mismatch(name: &str, expected: PropertyKind, found: &PropertyValue) -> SceneError {
    SceneError::Precondition(format!(
        "property '{name}' expects {expected:?}, got {:?}",
        found.kind()
    ))
}

/// Static description of one property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Property name
    pub name: &'static str,
    /// Value kind
    pub kind: PropertyKind,
    /// Short description for tooling
    pub description: &'static str,
}

impl PropertyDescriptor {
    /// Build a descriptor
    pub const fn new(name: &'static str, kind: PropertyKind, description: &'static str) -> Self {
        Self { name, kind, description }
    }
}

/// Name-based property access for a component type
pub trait Inspect {
    /// The type's property table
    fn schema(&self) -> &'static [PropertyDescriptor];

    /// Read one property
    fn get(&self, name: &str) -> Option<PropertyValue>;

    /// Write one property
    fn set(&mut self, name: &str, value: &PropertyValue) -> Result<(), SceneError>;

    /// Every property in schema order
    fn properties(&self) -> Vec<(String, PropertyValue)> {
        self.schema()
            .iter()
            .filter_map(|descriptor| {
                self.get(descriptor.name)
                    .map(|value| (descriptor.name.to_string(), value))
            })
            .collect()
    }
}

pub(crate) fn unknown_property(component: &str, name: &str) -> SceneError {
    SceneError::Precondition(format!("{component} has no property '{name}'"))
}

/// Serializable view of a whole scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    /// Nodes in depth-first order, parents before children
    pub nodes: Vec<NodeSnapshot>,
}

/// Serializable view of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Stable node id
    pub id: u64,
    /// Display name
    pub name: String,
    /// Layer bits
    pub layer: u32,
    /// Parent id
    pub parent: Option<u64>,
    /// Child ids in attachment order
    pub children: Vec<u64>,
    /// Local position
    pub position: [f32; 3],
    /// Local rotation as `[i, j, k, w]`
    pub rotation: [f32; 4],
    /// Local scale
    pub scale: [f32; 3],
    /// Attached components in attachment order
    pub components: Vec<ComponentSnapshot>,
}

/// Serializable view of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    /// Stable component id
    pub id: u64,
    /// Kind name
    pub kind: String,
    /// Whether the component is enabled
    pub enabled: bool,
    /// Property values
    pub properties: Vec<(String, PropertyValue)>,
}
