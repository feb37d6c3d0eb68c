//! Layer masks for selective rendering and raycasting

use bitflags::bitflags;

use crate::scene::SceneError;

bitflags! {
    /// Set of layers a node belongs to, or a mask of layers a query accepts
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Layer: u32 {
        /// Layer every new node starts on
        const DEFAULT = 1;
        /// Overlay geometry
        const UI = 1 << 1;
        /// Nodes on this layer are skipped by default raycasts
        const IGNORE_RAYCAST = 1 << 31;
        /// Every layer
        const ALL = u32::MAX;
    }
}

impl Default for Layer {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Layer {
    /// Number of distinct layer bits
    pub const COUNT: u32 = 32;

    /// Layer with only bit `index` set
    pub fn from_index(index: u32) -> Result<Self, SceneError> {
        if index >= Self::COUNT {
            return Err(SceneError::Precondition(format!(
                "layer index {index} is out of range 0..{}",
                Self::COUNT
            )));
        }
        Ok(Self::from_bits_retain(1 << index))
    }

    /// This mask plus layer `index`
    pub fn with_index(self, index: u32) -> Result<Self, SceneError> {
        Ok(self | Self::from_index(index)?)
    }

    /// This mask minus layer `index`
    pub fn without_index(self, index: u32) -> Result<Self, SceneError> {
        Ok(self - Self::from_index(index)?)
    }
}

bitflags! {
    /// What a registered component participates in
    ///
    /// Computed once when a component is added; the scene's typed indexes
    /// are filled from these bits rather than by inspecting types later.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Listed in the camera index
        const CAMERA = 1;
        /// Listed in the light index
        const LIGHT = 1 << 1;
        /// Listed in the collider index
        const COLLIDER = 1 << 2;
        /// Updated every frame
        const UPDATABLE = 1 << 3;
        /// Partitioned into the renderable collection
        const RENDERABLE = 1 << 4;
    }
}
