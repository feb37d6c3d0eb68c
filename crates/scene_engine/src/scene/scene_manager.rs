//! Scene orchestrator
//!
//! The [`Scene`] owns the node graph, the component arena, the typed
//! component indexes (cameras, lights, colliders, updatables, renderables),
//! the tweens and the render context, and drives them once per
//! [`Scene::frame`]:
//!
//! 1. Sample the clock
//! 2. Step tweens
//! 3. Start the components added since the last frame, in attachment order.
//!    The queue is swapped out first, so anything added by a `start` hook
//!    waits for the following frame
//! 4. Update enabled, started updatables, newest first. Disposed entries
//!    are dropped from the index as they are met
//! 5. Render: clear to the background when there is no camera, otherwise
//!    hand the cameras (sorted by order, stable), lights and renderable
//!    partitions to the render technique
//!
//! A failing `start` or `update` hook is logged and counted in
//! [`FrameStats::update_faults`]; the remaining components still run.

use std::mem;
use std::sync::Arc;

use slotmap::SlotMap;

use crate::components::{
    Camera, CameraView, Collider, LightSource, LightView, Renderable, Renderer,
};
use crate::config::SceneConfig;
use crate::foundation::math::{utils, Vec2, Vec4};
use crate::foundation::time::{MonotonicClock, SceneTime, Stopwatch, TimeSource};
use crate::physics::{Ray, RaycastCandidate, RaycastMode, RaycastResult, RaycastTarget, Raycaster};
use crate::render::{
    ForwardTechnique, GpuBackend, Material, Mesh, RenderContext, RenderTechnique,
};
use crate::scene::component::{
    Behaviour, ComponentContext, ComponentId, ComponentKey, ComponentKind, ComponentRecord,
    ComponentState,
};
use crate::scene::frame_stats::FrameStats;
use crate::scene::render_queue::{RenderItem, RenderableCollection};
use crate::scene::scene_graph::{Node, NodeId, NodeKey, SceneGraph, SceneId};
use crate::scene::schema::{
    ComponentSnapshot, Inspect, NodeSnapshot, PropertyDescriptor, PropertyValue, SceneSnapshot,
};
use crate::scene::{Capabilities, Layer, SceneError};
use crate::tween::{CancellationToken, Tween, TweenCollection};

#[derive(Debug, Clone, Copy)]
enum Hook {
    Start,
    Update,
}

/// A scene graph with its components, driven frame by frame
pub struct Scene {
    id: SceneId,
    config: SceneConfig,
    graph: SceneGraph,
    components: SlotMap<ComponentKey, ComponentRecord>,

    pending_start: Vec<ComponentKey>,
    updatables: Vec<ComponentKey>,
    cameras: Vec<ComponentKey>,
    lights: Vec<ComponentKey>,
    colliders: Vec<ComponentKey>,
    renderables: RenderableCollection,

    context: RenderContext,
    technique: Box<dyn RenderTechnique>,
    default_material: Arc<Material>,
    tweens: TweenCollection,

    time: Arc<SceneTime>,
    clock: Box<dyn TimeSource>,
    screen_size: (u32, u32),

    stats: FrameStats,
    fps_frames: u32,
    fps_window_start: f64,
}

impl Scene {
    /// Create an empty scene rendering through `backend` with the forward
    /// technique and the monotonic clock
    pub fn new(config: SceneConfig, backend: Box<dyn GpuBackend>) -> Self {
        let id = SceneId::next();
        log::info!("Creating scene {}", id.raw());
        Self {
            id,
            technique: Box::new(ForwardTechnique::new(config.frustum_culling)),
            screen_size: config.screen_size,
            config,
            graph: SceneGraph::new(id),
            components: SlotMap::with_key(),
            pending_start: Vec::new(),
            updatables: Vec::new(),
            cameras: Vec::new(),
            lights: Vec::new(),
            colliders: Vec::new(),
            renderables: RenderableCollection::new(),
            context: RenderContext::new(backend),
            default_material: Arc::new(Material::default()),
            tweens: TweenCollection::new(),
            time: Arc::new(SceneTime::new()),
            clock: Box::new(MonotonicClock::new()),
            stats: FrameStats::default(),
            fps_frames: 0,
            fps_window_start: 0.0,
        }
    }

    /// Replace the render technique, builder style
    #[must_use]
    pub fn with_technique(mut self, technique: Box<dyn RenderTechnique>) -> Self {
        log::debug!("Scene {} renders with '{}'", self.id.raw(), technique.name());
        self.technique = technique;
        self
    }

    /// Replace the clock, builder style
    #[must_use]
    pub fn with_time_source(mut self, clock: Box<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the material used by renderables without one, builder style
    #[must_use]
    pub fn with_default_material(mut self, material: Arc<Material>) -> Self {
        self.renderables.set_default_shader(material.shader());
        self.default_material = material;
        self
    }

    /// Scene identity
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Settings the scene was created with
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// The node graph
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// The node graph, mutably
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Shared frame clock; safe to read from other threads
    pub fn time(&self) -> Arc<SceneTime> {
        Arc::clone(&self.time)
    }

    /// Counters of the last frame
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Render context holding the backend and geometry cache
    pub fn render_context(&self) -> &RenderContext {
        &self.context
    }

    /// The backend
    pub fn backend(&self) -> &dyn GpuBackend {
        self.context.backend()
    }

    /// The backend, mutably
    pub fn backend_mut(&mut self) -> &mut dyn GpuBackend {
        self.context.backend_mut()
    }

    /// Material used by renderables without one
    pub fn default_material(&self) -> &Arc<Material> {
        &self.default_material
    }

    /// Render target size in pixels
    pub fn screen_size(&self) -> (u32, u32) {
        self.screen_size
    }

    /// Resize the render target. A zero dimension suspends rendering.
    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.screen_size = (width, height);
    }

    // ---- Nodes ----

    /// Create a root node
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let key = self.graph.insert(name.into(), None);
        self.graph.id_of(key)
    }

    /// Create a node under `parent`
    pub fn create_child(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId, SceneError> {
        let parent = self.graph.resolve(parent)?;
        let key = self.graph.insert(name.into(), Some(parent));
        Ok(self.graph.id_of(key))
    }

    /// Dispose a node, its descendants and all their components.
    ///
    /// Returns `false` if the node was already disposed.
    pub fn dispose_node(&mut self, id: NodeId) -> Result<bool, SceneError> {
        match self.graph.resolve(id) {
            Ok(key) => {
                self.dispose_node_key(key);
                Ok(true)
            }
            Err(SceneError::NodeDisposed) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn dispose_node_key(&mut self, key: NodeKey) {
        // Hooks may attach children or components mid-teardown; drain until empty
        while let Some(child) = self
            .graph
            .node(key)
            .and_then(|node| node.transform.children.first().copied())
        {
            self.dispose_node_key(child);
            if let Some(node) = self.graph.node_mut(key) {
                node.transform.children.retain(|&c| c != child);
            }
        }
        while let Some(component) = self.graph.node(key).and_then(|node| node.components.first().copied()) {
            self.dispose_component_key(component);
            if let Some(node) = self.graph.node_mut(key) {
                node.components.retain(|&c| c != component);
            }
        }
        if let Some(node) = self.graph.remove(key) {
            log::debug!("Disposed node '{}'", node.name);
        }
    }

    /// Dispose every node
    pub fn clear(&mut self) {
        for root in self.graph.roots() {
            if let Ok(key) = self.graph.resolve(root) {
                self.dispose_node_key(key);
            }
        }
        self.tweens.clear();
        self.pending_start.retain(|&key| self.components.contains_key(key));
        self.updatables.retain(|&key| self.components.contains_key(key));
    }

    // ---- Components ----

    fn component_id(&self, key: ComponentKey) -> ComponentId {
        ComponentId { scene: self.id, key }
    }

    fn component_key(&self, id: ComponentId) -> Result<ComponentKey, SceneError> {
        if id.scene != self.id {
            return Err(SceneError::ForeignComponent);
        }
        if self.components.contains_key(id.key) {
            Ok(id.key)
        } else {
            Err(SceneError::ComponentDisposed)
        }
    }

    fn record(&self, id: ComponentId) -> Result<&ComponentRecord, SceneError> {
        let key = self.component_key(id)?;
        self.components.get(key).ok_or(SceneError::ComponentDisposed)
    }

    fn record_mut(&mut self, id: ComponentId) -> Result<&mut ComponentRecord, SceneError> {
        let key = self.component_key(id)?;
        self.components.get_mut(key).ok_or(SceneError::ComponentDisposed)
    }

    /// Attach a component to `node`.
    ///
    /// The component joins the scene indexes immediately; its `start` runs
    /// at the beginning of the next frame. Renderables take their geometry
    /// cache reference here.
    pub fn add_component(
        &mut self,
        node: NodeId,
        component: impl Into<ComponentKind>,
    ) -> Result<ComponentId, SceneError> {
        let node_key = self.graph.resolve(node)?;
        let mut kind = component.into();
        if let ComponentKind::Renderable(renderable) = &mut kind {
            renderable.renderer.bind(&mut self.context)?;
        }
        let capabilities = kind.capabilities();
        let material = match &kind {
            ComponentKind::Renderable(renderable) => renderable.material().cloned(),
            _ => None,
        };
        log::debug!("Adding {} component to node {:?}", kind.kind_name(), node);

        let key = self.components.insert(ComponentRecord {
            node: node_key,
            enabled: true,
            state: ComponentState::Constructed,
            capabilities,
            kind,
        });
        if let Some(node) = self.graph.node_mut(node_key) {
            node.components.push(key);
        }

        if capabilities.contains(Capabilities::CAMERA) {
            self.cameras.push(key);
        }
        if capabilities.contains(Capabilities::LIGHT) {
            self.lights.push(key);
        }
        if capabilities.contains(Capabilities::COLLIDER) {
            self.colliders.push(key);
        }
        if capabilities.contains(Capabilities::UPDATABLE) {
            self.updatables.push(key);
        }
        if capabilities.contains(Capabilities::RENDERABLE) {
            self.renderables.add(key, material.as_deref());
        }
        self.pending_start.push(key);
        Ok(self.component_id(key))
    }

    /// Attach user logic to `node`
    pub fn add_behaviour(
        &mut self,
        node: NodeId,
        behaviour: impl Behaviour,
    ) -> Result<ComponentId, SceneError> {
        self.add_component(node, ComponentKind::Behaviour(Some(Box::new(behaviour))))
    }

    /// Detach and tear down a component.
    ///
    /// Returns `false` if it was already disposed.
    pub fn dispose_component(&mut self, id: ComponentId) -> Result<bool, SceneError> {
        match self.component_key(id) {
            Ok(key) => {
                self.dispose_component_key(key);
                Ok(true)
            }
            Err(SceneError::ComponentDisposed) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn dispose_component_key(&mut self, key: ComponentKey) {
        let Some(record) = self.components.remove(key) else {
            return;
        };
        if let Some(node) = self.graph.node_mut(record.node) {
            node.components.retain(|&c| c != key);
        }

        // `pending_start` and `updatables` drop stale keys lazily
        let capabilities = record.capabilities;
        if capabilities.contains(Capabilities::CAMERA) {
            self.cameras.retain(|&k| k != key);
        }
        if capabilities.contains(Capabilities::LIGHT) {
            self.lights.retain(|&k| k != key);
        }
        if capabilities.contains(Capabilities::COLLIDER) {
            self.colliders.retain(|&k| k != key);
        }
        if capabilities.contains(Capabilities::RENDERABLE) {
            self.renderables.remove(key);
        }

        log::debug!("Disposing {} component", record.kind.kind_name());
        let node = self.graph.id_of(record.node);
        let component = self.component_id(key);
        match record.kind {
            ComponentKind::Renderable(mut renderable) => {
                if let Err(err) = renderable.renderer.unbind(&mut self.context) {
                    log::error!("Failed to release {:?}: {err}", renderable.renderer);
                }
            }
            ComponentKind::Behaviour(Some(mut behaviour)) => {
                behaviour.on_dispose(&mut ComponentContext::new(self, node, component));
            }
            _ => {}
        }
    }

    /// Lifecycle state; stale ids of this scene report [`ComponentState::Disposed`]
    pub fn component_state(&self, id: ComponentId) -> Result<ComponentState, SceneError> {
        match self.record(id) {
            Ok(record) => Ok(record.state),
            Err(SceneError::ComponentDisposed) => Ok(ComponentState::Disposed),
            Err(err) => Err(err),
        }
    }

    /// Whether the component takes part in updates, rendering and raycasts
    pub fn is_component_enabled(&self, id: ComponentId) -> Result<bool, SceneError> {
        Ok(self.record(id)?.enabled)
    }

    /// Enable or disable a component
    pub fn set_component_enabled(&mut self, id: ComponentId, enabled: bool) -> Result<(), SceneError> {
        self.record_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Node a component is attached to
    pub fn component_node(&self, id: ComponentId) -> Result<NodeId, SceneError> {
        Ok(self.graph.id_of(self.record(id)?.node))
    }

    /// Components of a node in attachment order
    pub fn components_of(&self, node: NodeId) -> Result<Vec<ComponentId>, SceneError> {
        let node = self.graph.get(node)?;
        Ok(node.components.iter().map(|&key| self.component_id(key)).collect())
    }

    /// Kind name of a component
    pub fn component_kind(&self, id: ComponentId) -> Result<&'static str, SceneError> {
        Ok(self.record(id)?.kind.kind_name())
    }

    /// First component of `node`, in attachment order, with every bit of `capabilities`
    pub fn find_component(
        &self,
        node: NodeId,
        capabilities: Capabilities,
    ) -> Result<Option<ComponentId>, SceneError> {
        let node = self.graph.get(node)?;
        Ok(node
            .components
            .iter()
            .copied()
            .find(|&key| {
                self.components
                    .get(key)
                    .is_some_and(|record| record.capabilities.contains(capabilities))
            })
            .map(|key| self.component_id(key)))
    }

    /// First behaviour of type `T` attached to `node`
    pub fn find_behaviour<T: Behaviour>(&self, node: NodeId) -> Result<Option<ComponentId>, SceneError> {
        let node = self.graph.get(node)?;
        Ok(node
            .components
            .iter()
            .copied()
            .find(|&key| {
                self.components.get(key).is_some_and(|record| match &record.kind {
                    ComponentKind::Behaviour(Some(behaviour)) => behaviour.as_any().is::<T>(),
                    _ => false,
                })
            })
            .map(|key| self.component_id(key)))
    }

    /// Registered cameras in registration order
    pub fn cameras(&self) -> Vec<ComponentId> {
        self.cameras.iter().map(|&key| self.component_id(key)).collect()
    }

    /// The first registered camera
    pub fn main_camera(&self) -> Option<ComponentId> {
        self.cameras.first().map(|&key| self.component_id(key))
    }

    /// Registered lights in registration order
    pub fn lights(&self) -> Vec<ComponentId> {
        self.lights.iter().map(|&key| self.component_id(key)).collect()
    }

    /// Registered colliders in registration order
    pub fn colliders(&self) -> Vec<ComponentId> {
        self.colliders.iter().map(|&key| self.component_id(key)).collect()
    }

    /// Renderable partitions
    pub fn renderables(&self) -> &RenderableCollection {
        &self.renderables
    }

    /// Camera component
    pub fn camera(&self, id: ComponentId) -> Result<&Camera, SceneError> {
        match &self.record(id)?.kind {
            ComponentKind::Camera(camera) => Ok(camera),
            other => Err(wrong_kind("Camera", other)),
        }
    }

    /// Camera component, mutably
    pub fn camera_mut(&mut self, id: ComponentId) -> Result<&mut Camera, SceneError> {
        match &mut self.record_mut(id)?.kind {
            ComponentKind::Camera(camera) => Ok(camera),
            other => Err(wrong_kind("Camera", other)),
        }
    }

    /// Light component
    pub fn light(&self, id: ComponentId) -> Result<&LightSource, SceneError> {
        match &self.record(id)?.kind {
            ComponentKind::Light(light) => Ok(light),
            other => Err(wrong_kind("Light", other)),
        }
    }

    /// Light component, mutably
    pub fn light_mut(&mut self, id: ComponentId) -> Result<&mut LightSource, SceneError> {
        match &mut self.record_mut(id)?.kind {
            ComponentKind::Light(light) => Ok(light),
            other => Err(wrong_kind("Light", other)),
        }
    }

    /// Collider component
    pub fn collider(&self, id: ComponentId) -> Result<&Collider, SceneError> {
        match &self.record(id)?.kind {
            ComponentKind::Collider(collider) => Ok(collider),
            other => Err(wrong_kind("Collider", other)),
        }
    }

    /// Collider component, mutably
    pub fn collider_mut(&mut self, id: ComponentId) -> Result<&mut Collider, SceneError> {
        match &mut self.record_mut(id)?.kind {
            ComponentKind::Collider(collider) => Ok(collider),
            other => Err(wrong_kind("Collider", other)),
        }
    }

    /// Renderable component. Material and mesh changes go through
    /// [`Self::set_material`] and [`Self::set_mesh`].
    pub fn renderable(&self, id: ComponentId) -> Result<&Renderable, SceneError> {
        match &self.record(id)?.kind {
            ComponentKind::Renderable(renderable) => Ok(renderable),
            other => Err(wrong_kind("Renderable", other)),
        }
    }

    /// Renderable component, mutably
    pub fn renderable_mut(&mut self, id: ComponentId) -> Result<&mut Renderable, SceneError> {
        match &mut self.record_mut(id)?.kind {
            ComponentKind::Renderable(renderable) => Ok(renderable),
            other => Err(wrong_kind("Renderable", other)),
        }
    }

    /// User behaviour of type `T`
    pub fn behaviour<T: Behaviour>(&self, id: ComponentId) -> Result<&T, SceneError> {
        match &self.record(id)?.kind {
            ComponentKind::Behaviour(Some(behaviour)) => {
                behaviour
                    .as_any()
                    .downcast_ref::<T>()
                    .ok_or_else(|| SceneError::WrongComponentKind {
                        expected: std::any::type_name::<T>(),
                        found: behaviour.type_name(),
                    })
            }
            ComponentKind::Behaviour(None) => Err(running_behaviour()),
            other => Err(wrong_kind(std::any::type_name::<T>(), other)),
        }
    }

    /// User behaviour of type `T`, mutably
    pub fn behaviour_mut<T: Behaviour>(&mut self, id: ComponentId) -> Result<&mut T, SceneError> {
        match &mut self.record_mut(id)?.kind {
            ComponentKind::Behaviour(Some(behaviour)) => {
                let found = behaviour.type_name();
                behaviour
                    .as_any_mut()
                    .downcast_mut::<T>()
                    .ok_or(SceneError::WrongComponentKind {
                        expected: std::any::type_name::<T>(),
                        found,
                    })
            }
            ComponentKind::Behaviour(None) => Err(running_behaviour()),
            other => Err(wrong_kind(std::any::type_name::<T>(), other)),
        }
    }

    /// Assign a material (`None` selects the default material). The
    /// renderable moves between the opaque and transparent lists if the
    /// render queue changes.
    pub fn set_material(&mut self, id: ComponentId, material: Option<Arc<Material>>) -> Result<(), SceneError> {
        let key = self.component_key(id)?;
        let record = self.components.get_mut(key).ok_or(SceneError::ComponentDisposed)?;
        match &mut record.kind {
            ComponentKind::Renderable(renderable) => {
                if renderable.replace_material(material) {
                    self.renderables
                        .reclassify(key, renderable.material().map(|material| &**material));
                }
                Ok(())
            }
            other => Err(wrong_kind("Renderable", other)),
        }
    }

    /// Swap the mesh of a renderable. The old mesh's cache reference is
    /// released before the new one is acquired; other renderers sharing
    /// the old mesh are unaffected.
    pub fn set_mesh(&mut self, id: ComponentId, mesh: Arc<Mesh>) -> Result<(), SceneError> {
        let key = self.component_key(id)?;
        let record = self.components.get_mut(key).ok_or(SceneError::ComponentDisposed)?;
        match &mut record.kind {
            ComponentKind::Renderable(renderable) => {
                renderable.renderer.set_mesh(mesh, &mut self.context)?;
                Ok(())
            }
            other => Err(wrong_kind("Renderable", other)),
        }
    }

    /// Property table of a component type; behaviours have none
    pub fn component_schema(&self, id: ComponentId) -> Result<&'static [PropertyDescriptor], SceneError> {
        Ok(match &self.record(id)?.kind {
            ComponentKind::Camera(camera) => camera.schema(),
            ComponentKind::Light(light) => light.schema(),
            ComponentKind::Renderable(renderable) => renderable.schema(),
            ComponentKind::Collider(collider) => collider.schema(),
            ComponentKind::Behaviour(_) => &[],
        })
    }

    /// Current property values of a component
    pub fn component_properties(&self, id: ComponentId) -> Result<Vec<(String, PropertyValue)>, SceneError> {
        properties_of(&self.record(id)?.kind)
    }

    /// Write one property by name
    pub fn set_component_property(
        &mut self,
        id: ComponentId,
        name: &str,
        value: &PropertyValue,
    ) -> Result<(), SceneError> {
        match &mut self.record_mut(id)?.kind {
            ComponentKind::Camera(camera) => camera.set(name, value),
            ComponentKind::Light(light) => light.set(name, value),
            ComponentKind::Renderable(renderable) => renderable.set(name, value),
            ComponentKind::Collider(collider) => collider.set(name, value),
            ComponentKind::Behaviour(_) => Err(SceneError::Precondition(format!(
                "behaviour property '{name}' is read only"
            ))),
        }
    }

    // ---- Tweens ----

    /// Start a tween at the current scene time, cancelling any tween with
    /// the same token
    pub fn add_tween(&mut self, tween: impl Tween + 'static) {
        self.tweens.add(Box::new(tween), self.time.now(), &self.graph);
    }

    /// Cancel the tween holding `token`
    pub fn cancel_tween(&mut self, token: CancellationToken) -> bool {
        self.tweens.cancel(token)
    }

    /// Active tweens
    pub fn tweens(&self) -> &TweenCollection {
        &self.tweens
    }

    // ---- Frame ----

    /// Run one frame. Hook faults are logged and counted; backend failures
    /// are returned.
    pub fn frame(&mut self) -> Result<(), SceneError> {
        let stopwatch = Stopwatch::start_new();
        self.time.advance(self.clock.seconds());

        self.tweens.update(self.time.now(), &mut self.graph);
        let faults = self.flush_pending_starts() + self.run_updates();
        let draw_calls = self.render()?;

        self.stats.frame = self.time.frame();
        self.stats.draw_calls = draw_calls;
        self.stats.update_faults = faults;
        self.stats.frame_time_ms = stopwatch.elapsed_millis();
        self.measure_fps();
        log::trace!(
            "Frame {}: {} draws, {} faults",
            self.stats.frame,
            draw_calls,
            faults
        );
        Ok(())
    }

    fn flush_pending_starts(&mut self) -> usize {
        let pending = mem::take(&mut self.pending_start);
        let mut faults = 0;
        for key in pending {
            match self.components.get_mut(key) {
                Some(record) if record.state == ComponentState::Constructed => {
                    record.state = ComponentState::Started;
                }
                _ => continue,
            }
            if let Err(err) = self.run_hook(key, Hook::Start) {
                log::error!("Component start failed: {err}");
                faults += 1;
            }
        }
        faults
    }

    fn run_updates(&mut self) -> usize {
        let mut faults = 0;
        let mut index = self.updatables.len();
        while index > 0 {
            index -= 1;
            let Some(&key) = self.updatables.get(index) else {
                continue;
            };
            let runnable = match self.components.get(key) {
                Some(record) => record.enabled && record.state == ComponentState::Started,
                None => {
                    self.updatables.remove(index);
                    continue;
                }
            };
            if runnable {
                if let Err(err) = self.run_hook(key, Hook::Update) {
                    log::error!("Component update failed: {err}");
                    faults += 1;
                }
            }
        }
        faults
    }

    /// Run a behaviour hook with the behaviour moved out of its slot
    fn run_hook(&mut self, key: ComponentKey, hook: Hook) -> Result<(), SceneError> {
        let Some(record) = self.components.get_mut(key) else {
            return Ok(());
        };
        let node_key = record.node;
        let ComponentKind::Behaviour(slot) = &mut record.kind else {
            return Ok(());
        };
        let Some(mut behaviour) = slot.take() else {
            return Ok(());
        };

        let node = self.graph.id_of(node_key);
        let component = self.component_id(key);
        let result = {
            let mut ctx = ComponentContext::new(self, node, component);
            match hook {
                Hook::Start => behaviour.start(&mut ctx),
                Hook::Update => behaviour.update(&mut ctx),
            }
        };

        match self.components.get_mut(key) {
            Some(ComponentRecord {
                kind: ComponentKind::Behaviour(slot),
                ..
            }) => *slot = Some(behaviour),
            _ => {
                // Disposed by its own hook
                behaviour.on_dispose(&mut ComponentContext::new(self, node, component));
            }
        }
        result
    }

    fn render(&mut self) -> Result<usize, SceneError> {
        self.stats.culled = 0;
        let (width, height) = self.screen_size;
        if width == 0 || height == 0 {
            log::trace!("Screen has zero size; skipping render");
            return Ok(0);
        }

        let cameras = self.camera_views();
        if cameras.is_empty() {
            let background = self.config.background_color;
            let backend = self.context.backend_mut();
            backend.clear(Some(Vec4::new(background.x, background.y, background.z, 1.0)), true)?;
            backend.present()?;
            return Ok(0);
        }

        let lights = self.light_views();
        self.prepare_renderables()?;
        let draws = self.technique.render_all(
            &cameras,
            &lights,
            &mut self.renderables,
            self.context.backend_mut(),
        )?;
        self.stats.culled = self.technique.culled_last_frame();
        Ok(draws)
    }

    #[allow(clippy::cast_precision_loss)]
    fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.screen_size;
        if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        }
    }

    fn camera_view(&self, key: ComponentKey) -> Option<CameraView> {
        let record = self.components.get(key)?;
        let ComponentKind::Camera(camera) = &record.kind else {
            return None;
        };
        let world = self.graph.world_matrix_of(record.node);
        let Some(view) = self.graph.inverse_world_matrix_of(record.node) else {
            log::warn!("Camera node has a singular transform; skipping");
            return None;
        };
        Some(camera.view(self.component_id(key), &world, view, self.aspect_ratio()))
    }

    /// Enabled cameras, stable-sorted by order
    fn camera_views(&self) -> Vec<CameraView> {
        let mut views: Vec<CameraView> = self
            .cameras
            .iter()
            .filter(|&&key| self.components.get(key).is_some_and(|record| record.enabled))
            .filter_map(|&key| self.camera_view(key))
            .collect();
        views.sort_by_key(|view| view.order);
        views
    }

    fn light_views(&self) -> Vec<LightView> {
        self.lights
            .iter()
            .filter_map(|&key| {
                let record = self.components.get(key).filter(|record| record.enabled)?;
                let ComponentKind::Light(light) = &record.kind else {
                    return None;
                };
                let world = self.graph.world_matrix_of(record.node);
                Some(light.view(
                    self.component_id(key),
                    utils::translation_of(&world),
                    self.graph.world_rotation_of(record.node),
                ))
            })
            .collect()
    }

    fn prepare_renderables(&mut self) -> Result<(), SceneError> {
        self.renderables.begin_frame();
        for key in self.renderables.keys() {
            let Some(record) = self.components.get_mut(key) else {
                continue;
            };
            if !record.enabled {
                continue;
            }
            let node = record.node;
            let ComponentKind::Renderable(renderable) = &mut record.kind else {
                continue;
            };

            let model = self.graph.world_matrix_of(node);
            let draw = renderable.renderer.prerender(&mut self.context)?;
            let item = RenderItem {
                component: ComponentId { scene: self.id, key },
                layer: self.graph.node(node).map_or(Layer::DEFAULT, Node::layer),
                model,
                position: utils::translation_of(&model),
                bounds: renderable
                    .renderer
                    .bounding_sphere()
                    .map(|bounds| bounds.transformed(&model)),
                material: renderable
                    .material()
                    .cloned()
                    .unwrap_or_else(|| Arc::clone(&self.default_material)),
                draw,
            };
            self.renderables.set_item(key, item);
        }
        Ok(())
    }

    fn measure_fps(&mut self) {
        self.fps_frames += 1;
        let now = self.time.now_f64();
        let elapsed = now - self.fps_window_start;
        if elapsed > 0.0 && elapsed >= f64::from(self.config.fps_window) {
            #[allow(clippy::cast_possible_truncation)]
            let fps = (f64::from(self.fps_frames) / elapsed) as f32;
            self.stats.fps = fps;
            self.fps_frames = 0;
            self.fps_window_start = now;
        }
    }

    // ---- Queries ----

    /// Nearest renderable hit on the configured raycast layers
    pub fn raycast(&self, ray: &Ray) -> RaycastResult {
        self.raycast_with(ray, self.config.raycast_mask(), RaycastMode::Nearest)
    }

    /// Raycast enabled, raycastable renderables on `layers`
    pub fn raycast_with(&self, ray: &Ray, layers: Layer, mode: RaycastMode) -> RaycastResult {
        let candidates = self.renderables.keys().into_iter().filter_map(|key| {
            let record = self.components.get(key)?;
            let ComponentKind::Renderable(renderable) = &record.kind else {
                return None;
            };
            if !renderable.is_raycastable() {
                return None;
            }
            let mesh: &Mesh = renderable.mesh()?;
            self.raycast_candidate(key, record, mesh, layers)
        });
        Raycaster::cast(ray, candidates, mode)
    }

    /// Raycast enabled colliders on `layers`
    pub fn raycast_colliders(&self, ray: &Ray, layers: Layer, mode: RaycastMode) -> RaycastResult {
        let candidates = self.colliders.iter().filter_map(|&key| {
            let record = self.components.get(key)?;
            let ComponentKind::Collider(collider) = &record.kind else {
                return None;
            };
            self.raycast_candidate(key, record, collider, layers)
        });
        Raycaster::cast(ray, candidates, mode)
    }

    fn raycast_candidate<'a>(
        &self,
        key: ComponentKey,
        record: &ComponentRecord,
        target: &'a dyn RaycastTarget,
        layers: Layer,
    ) -> Option<RaycastCandidate<'a>> {
        if !record.enabled {
            return None;
        }
        let layer = self.graph.node(record.node)?.layer;
        // IGNORE_RAYCAST wins unless the query asks for it explicitly
        let ignored = layer.contains(Layer::IGNORE_RAYCAST) && !layers.contains(Layer::IGNORE_RAYCAST);
        if ignored || !layer.intersects(layers) {
            return None;
        }
        Some(RaycastCandidate {
            component: self.component_id(key),
            node: self.graph.id_of(record.node),
            model: self.graph.world_matrix_of(record.node),
            inverse: self.graph.inverse_world_matrix_of(record.node)?,
            target,
        })
    }

    /// World-space ray through a pixel of `camera`'s view
    pub fn screen_ray(&self, camera: ComponentId, screen: Vec2) -> Result<Option<Ray>, SceneError> {
        self.camera(camera)?;
        let key = self.component_key(camera)?;
        let view = self.camera_view(key).ok_or(SceneError::SingularTransform)?;
        Ok(view.screen_ray(screen, self.screen_size))
    }

    /// Serializable view of the whole scene, parents before children
    pub fn snapshot(&self) -> SceneSnapshot {
        let mut nodes = Vec::with_capacity(self.graph.len());
        let mut stack: Vec<NodeKey> = self.graph.roots().iter().rev().map(|id| id.key).collect();
        while let Some(key) = stack.pop() {
            let Some(node) = self.graph.node(key) else {
                continue;
            };
            nodes.push(self.node_snapshot(key, node));
            stack.extend(node.transform.children.iter().rev().copied());
        }
        SceneSnapshot { nodes }
    }

    fn node_snapshot(&self, key: NodeKey, node: &Node) -> NodeSnapshot {
        let local = node.transform.local();
        let rotation = local.rotation.coords;
        NodeSnapshot {
            id: self.graph.id_of(key).to_raw(),
            name: node.name.clone(),
            layer: node.layer.bits(),
            parent: node.transform.parent.map(|parent| self.graph.id_of(parent).to_raw()),
            children: node
                .transform
                .children
                .iter()
                .map(|&child| self.graph.id_of(child).to_raw())
                .collect(),
            position: local.position.into(),
            rotation: [rotation.x, rotation.y, rotation.z, rotation.w],
            scale: local.scale.into(),
            components: node
                .components
                .iter()
                .filter_map(|&component| {
                    let record = self.components.get(component)?;
                    Some(ComponentSnapshot {
                        id: self.component_id(component).to_raw(),
                        kind: record.kind.kind_name().to_string(),
                        enabled: record.enabled,
                        properties: properties_of(&record.kind).unwrap_or_default(),
                    })
                })
                .collect(),
        }
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("nodes", &self.graph.len())
            .field("components", &self.components.len())
            .field("renderables", &self.renderables.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

fn wrong_kind(expected: &'static str, found: &ComponentKind) -> SceneError {
    SceneError::WrongComponentKind {
        expected,
        found: found.kind_name(),
    }
}

fn running_behaviour() -> SceneError {
    SceneError::Precondition("behaviour is inside one of its own hooks".into())
}

fn properties_of(kind: &ComponentKind) -> Result<Vec<(String, PropertyValue)>, SceneError> {
    Ok(match kind {
        ComponentKind::Camera(camera) => camera.properties(),
        ComponentKind::Light(light) => light.properties(),
        ComponentKind::Renderable(renderable) => renderable.properties(),
        ComponentKind::Collider(collider) => collider.properties(),
        ComponentKind::Behaviour(Some(behaviour)) => behaviour.properties(),
        ComponentKind::Behaviour(None) => return Err(running_behaviour()),
    })
}
