//! Component records, kinds and the user behaviour trait
//!
//! Built-in components are plain data variants of [`ComponentKind`]. User
//! logic plugs in through [`Behaviour`]. A component's [`Capabilities`] are
//! computed once, when it is added, and decide which scene indexes list it.

use std::any::Any;

use slotmap::Key;

use crate::components::{Camera, Collider, LightSource, Renderable};
use crate::scene::schema::PropertyValue;
use crate::scene::scene_graph::{NodeId, NodeKey, SceneId};
use crate::scene::{Capabilities, Scene, SceneError};

slotmap::new_key_type! {
    /// Arena key of a component inside one scene
    pub struct ComponentKey;
}

/// Stable handle to a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId {
    pub(crate) scene: SceneId,
    pub(crate) key: ComponentKey,
}

impl ComponentId {
    /// Scene the component belongs to
    pub fn scene(self) -> SceneId {
        self.scene
    }

    /// Numeric form used by snapshots
    pub fn to_raw(self) -> u64 {
        self.key.data().as_ffi()
    }
}

/// Lifecycle position of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentState {
    /// Registered and indexed, waiting for the next frame to start
    Constructed,
    /// `start` has run
    Started,
    /// Torn down; the id no longer resolves
    Disposed,
}

/// User-defined component logic
///
/// Hooks receive a [`ComponentContext`] with mutable access to the whole
/// scene. While a hook runs, the behaviour is temporarily moved out of its
/// slot, so looking itself up through the scene fails with a precondition
/// error.
pub trait Behaviour: Any {
    /// Which scene indexes this behaviour joins. Only
    /// [`Capabilities::UPDATABLE`] is meaningful for behaviours.
    fn capabilities(&self) -> Capabilities {
        Capabilities::UPDATABLE
    }

    /// Called once, at the first frame boundary after the component was added
    fn start(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    /// Called every frame while enabled and started
    fn update(&mut self, _ctx: &mut ComponentContext<'_>) -> Result<(), SceneError> {
        Ok(())
    }

    /// Called once when the component is disposed
    fn on_dispose(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Name reported in snapshots and kind errors
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Serializable properties
    fn properties(&self) -> Vec<(String, PropertyValue)> {
        Vec::new()
    }

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Everything a component can be
pub enum ComponentKind {
    /// Viewpoint for rendering
    Camera(Camera),
    /// Light source
    Light(LightSource),
    /// Geometry drawn with a material through a renderer
    Renderable(Renderable),
    /// Raycastable analytic shape
    Collider(Collider),
    /// User logic; `None` while one of its hooks is running
    Behaviour(Option<Box<dyn Behaviour>>),
}

impl ComponentKind {
    /// Human readable kind name
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Camera(_) => "Camera",
            Self::Light(_) => "Light",
            Self::Renderable(_) => "Renderable",
            Self::Collider(_) => "Collider",
            Self::Behaviour(Some(behaviour)) => behaviour.type_name(),
            Self::Behaviour(None) => "Behaviour",
        }
    }

    pub(crate) fn capabilities(&self) -> Capabilities {
        match self {
            Self::Camera(_) => Capabilities::CAMERA,
            Self::Light(_) => Capabilities::LIGHT,
            Self::Renderable(_) => Capabilities::RENDERABLE,
            Self::Collider(_) => Capabilities::COLLIDER,
            Self::Behaviour(Some(behaviour)) => behaviour.capabilities() & Capabilities::UPDATABLE,
            Self::Behaviour(None) => Capabilities::empty(),
        }
    }
}

impl std::fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind_name())
    }
}

impl From<Camera> for ComponentKind {
    fn from(camera: Camera) -> Self {
        Self::Camera(camera)
    }
}

impl From<LightSource> for ComponentKind {
    fn from(light: LightSource) -> Self {
        Self::Light(light)
    }
}

impl From<Renderable> for ComponentKind {
    fn from(renderable: Renderable) -> Self {
        Self::Renderable(renderable)
    }
}

impl From<Collider> for ComponentKind {
    fn from(collider: Collider) -> Self {
        Self::Collider(collider)
    }
}

/// Arena entry for one component
#[derive(Debug)]
pub(crate) struct ComponentRecord {
    pub(crate) node: NodeKey,
    pub(crate) enabled: bool,
    pub(crate) state: ComponentState,
    pub(crate) capabilities: Capabilities,
    pub(crate) kind: ComponentKind,
}

/// Access handed to behaviour hooks
pub struct ComponentContext<'a> {
    scene: &'a mut Scene,
    node: NodeId,
    component: ComponentId,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(scene: &'a mut Scene, node: NodeId, component: ComponentId) -> Self {
        Self { scene, node, component }
    }

    /// Node the component is attached to
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The component being run
    pub fn component(&self) -> ComponentId {
        self.component
    }

    /// Read access to the scene
    pub fn scene(&self) -> &Scene {
        self.scene
    }

    /// Write access to the scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        self.scene
    }
}
